use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
};

use crate::theme::Base16Palette;
use crate::viewer::OverviewEntry;

/// Side panel listing the active viewer's overview entries.
///
/// The entries are a snapshot; the host refreshes them after each load and
/// after every jump.
#[derive(Default)]
pub struct OverviewPanel {
    entries: Vec<OverviewEntry>,
    state: ListState,
}

impl OverviewPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entries, keeping the selection where possible.
    pub fn set_entries(&mut self, entries: Vec<OverviewEntry>) {
        let selected = self.state.selected().unwrap_or(0);
        self.entries = entries;
        if self.entries.is_empty() {
            self.state.select(None);
        } else {
            self.state.select(Some(selected.min(self.entries.len() - 1)));
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.state.select(None);
    }

    pub fn entries(&self) -> &[OverviewEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn selected(&self) -> Option<usize> {
        self.state.selected()
    }

    /// Moves the selection. Returns the index to jump to on Enter.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }
        let last = self.entries.len() - 1;
        let current = self.state.selected().unwrap_or(0);
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.state.select(Some((current + 1).min(last)));
                None
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.state.select(Some(current.saturating_sub(1)));
                None
            }
            KeyCode::Char('g') | KeyCode::Home => {
                self.state.select(Some(0));
                None
            }
            KeyCode::Char('G') | KeyCode::End => {
                self.state.select(Some(last));
                None
            }
            KeyCode::Enter | KeyCode::Char('l') => Some(current),
            _ => None,
        }
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect, focused: bool, palette: &Base16Palette) {
        let (text_color, border_color, bg_color) = palette.get_panel_colors(focused);
        let (selection_bg, selection_fg) = palette.get_selection_colors(focused);

        let items: Vec<ListItem> = self
            .entries
            .iter()
            .map(|entry| {
                let indent = "  ".repeat(entry.depth);
                ListItem::new(Line::from(Span::styled(
                    format!("{indent}{}", entry.title),
                    Style::default().fg(text_color),
                )))
            })
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .title(" Overview ")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(border_color))
                    .style(Style::default().bg(bg_color)),
            )
            .highlight_style(
                Style::default()
                    .bg(selection_bg)
                    .fg(selection_fg)
                    .add_modifier(Modifier::BOLD),
            );

        f.render_stateful_widget(list, area, &mut self.state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventKind, KeyEventState, KeyModifiers};

    fn key(c: char) -> KeyEvent {
        KeyEvent {
            code: KeyCode::Char(c),
            modifiers: KeyModifiers::empty(),
            kind: KeyEventKind::Press,
            state: KeyEventState::empty(),
        }
    }

    #[test]
    fn selection_is_clamped_when_entries_shrink() {
        let mut panel = OverviewPanel::new();
        panel.set_entries((0..5).map(|i| OverviewEntry::new(format!("Page {i}"), 0)).collect());
        panel.handle_key(key('G'));
        assert_eq!(panel.selected(), Some(4));

        panel.set_entries(vec![OverviewEntry::new("only", 0)]);
        assert_eq!(panel.selected(), Some(0));
        assert_eq!(panel.handle_key(key('l')), Some(0));
    }

    #[test]
    fn empty_panel_ignores_keys() {
        let mut panel = OverviewPanel::new();
        assert_eq!(panel.handle_key(key('j')), None);
        assert_eq!(panel.selected(), None);
    }
}
