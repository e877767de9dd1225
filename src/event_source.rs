use anyhow::Result;
pub use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
use std::collections::VecDeque;
use std::time::Duration;

/// Where the host loop gets its terminal events from
pub trait EventSource {
    fn poll(&mut self, timeout: Duration) -> Result<bool>;

    fn read(&mut self) -> Result<Event>;
}

/// Terminal input through crossterm
pub struct KeyboardEventSource;

impl EventSource for KeyboardEventSource {
    fn poll(&mut self, timeout: Duration) -> Result<bool> {
        Ok(crossterm::event::poll(timeout)?)
    }

    fn read(&mut self) -> Result<Event> {
        Ok(crossterm::event::read()?)
    }
}

/// Scripted input for driving the host in tests.
///
/// Once the script runs out, `read` keeps answering with `q` so a loop that
/// is still reading always terminates.
pub struct SimulatedEventSource {
    events: VecDeque<Event>,
}

impl SimulatedEventSource {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events: events.into(),
        }
    }

    pub fn push(&mut self, event: Event) {
        self.events.push_back(event);
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }

    pub fn key_event(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::empty(),
        })
    }

    pub fn char_key(c: char) -> Event {
        Self::key_event(KeyCode::Char(c), KeyModifiers::empty())
    }

    pub fn ctrl_char_key(c: char) -> Event {
        Self::key_event(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    pub fn resize(columns: u16, rows: u16) -> Event {
        Event::Resize(columns, rows)
    }
}

impl EventSource for SimulatedEventSource {
    fn poll(&mut self, _timeout: Duration) -> Result<bool> {
        Ok(!self.events.is_empty())
    }

    fn read(&mut self) -> Result<Event> {
        Ok(self
            .events
            .pop_front()
            .unwrap_or_else(|| SimulatedEventSource::char_key('q')))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_come_back_in_order_then_quit() {
        let mut source = SimulatedEventSource::new(vec![
            SimulatedEventSource::char_key('j'),
            SimulatedEventSource::ctrl_char_key('d'),
        ]);
        source.push(SimulatedEventSource::resize(100, 30));
        assert_eq!(source.remaining(), 3);
        assert!(source.poll(Duration::from_millis(0)).unwrap());

        match source.read().unwrap() {
            Event::Key(key) => {
                assert_eq!(key.code, KeyCode::Char('j'));
                assert!(key.modifiers.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
        match source.read().unwrap() {
            Event::Key(key) => assert!(key.modifiers.contains(KeyModifiers::CONTROL)),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(source.read().unwrap(), Event::Resize(100, 30));

        assert!(!source.poll(Duration::from_millis(0)).unwrap());
        assert_eq!(source.read().unwrap(), SimulatedEventSource::char_key('q'));
    }
}
