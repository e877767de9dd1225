use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Vertical scroll position shared by the line-oriented viewers.
///
/// `len` and `viewport` are refreshed by the owning viewer: `len` when the
/// document loads, `viewport` on every render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScrollState {
    offset: usize,
    len: usize,
    viewport: usize,
}

impl ScrollState {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn viewport(&self) -> usize {
        self.viewport
    }

    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        self.clamp();
    }

    pub fn set_viewport(&mut self, height: usize) {
        self.viewport = height;
        self.clamp();
    }

    pub fn set_offset(&mut self, offset: usize) {
        self.offset = offset;
        self.clamp();
    }

    pub fn max_offset(&self) -> usize {
        self.len.saturating_sub(self.viewport.max(1))
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.offset = self.offset.saturating_add(lines);
        self.clamp();
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.offset = self.offset.saturating_sub(lines);
    }

    pub fn to_top(&mut self) {
        self.offset = 0;
    }

    pub fn to_bottom(&mut self) {
        self.offset = self.max_offset();
    }

    /// Make `line` visible, scrolling the minimum amount.
    pub fn reveal(&mut self, line: usize) {
        let viewport = self.viewport.max(1);
        if line < self.offset {
            self.offset = line;
        } else if line >= self.offset + viewport {
            self.offset = line + 1 - viewport;
        }
        self.clamp();
    }

    fn half_page(&self) -> usize {
        (self.viewport / 2).max(1)
    }

    fn page(&self) -> usize {
        self.viewport.max(1)
    }

    /// Vim-style motions; returns true when the key was a scroll key.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('j') | KeyCode::Down if !ctrl => self.scroll_down(1),
            KeyCode::Char('k') | KeyCode::Up if !ctrl => self.scroll_up(1),
            KeyCode::Char('d') if ctrl => self.scroll_down(self.half_page()),
            KeyCode::Char('u') if ctrl => self.scroll_up(self.half_page()),
            KeyCode::Char('f') if ctrl => self.scroll_down(self.page()),
            KeyCode::Char('b') if ctrl => self.scroll_up(self.page()),
            KeyCode::PageDown | KeyCode::Char(' ') => self.scroll_down(self.page()),
            KeyCode::PageUp => self.scroll_up(self.page()),
            KeyCode::Char('g') | KeyCode::Home if !ctrl => self.to_top(),
            KeyCode::Char('G') | KeyCode::End => self.to_bottom(),
            _ => return false,
        }
        true
    }

    fn clamp(&mut self) {
        if self.offset > self.max_offset() {
            self.offset = self.max_offset();
        }
    }
}
