use std::path::{Path, PathBuf};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::warn;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState},
};

use crate::theme::Base16Palette;

use super::centered_rect;

pub enum FileBrowserAction {
    Close,
    Open(PathBuf),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrowserEntry {
    pub path: PathBuf,
    pub name: String,
    pub is_dir: bool,
}

/// Popup for picking a file to open, one directory at a time.
pub struct FileBrowser {
    directory: PathBuf,
    entries: Vec<BrowserEntry>,
    state: ListState,
    show_hidden: bool,
    error: Option<String>,
}

impl FileBrowser {
    pub fn new(directory: &Path) -> Self {
        let mut browser = Self {
            directory: directory.to_path_buf(),
            entries: Vec::new(),
            state: ListState::default(),
            show_hidden: false,
            error: None,
        };
        browser.refresh();
        browser
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn entries(&self) -> &[BrowserEntry] {
        &self.entries
    }

    pub fn selected(&self) -> Option<&BrowserEntry> {
        self.state.selected().and_then(|i| self.entries.get(i))
    }

    /// Select the entry with the given file name.
    pub fn select_name(&mut self, name: &str) -> bool {
        match self.entries.iter().position(|e| e.name == name) {
            Some(index) => {
                self.state.select(Some(index));
                true
            }
            None => false,
        }
    }

    fn refresh(&mut self) {
        self.error = None;
        self.entries = match list_directory(&self.directory, self.show_hidden) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read directory {:?}: {e}", self.directory);
                self.error = Some(e.to_string());
                Vec::new()
            }
        };
        if let Some(parent) = self.directory.parent() {
            self.entries.insert(
                0,
                BrowserEntry {
                    path: parent.to_path_buf(),
                    name: "..".to_string(),
                    is_dir: true,
                },
            );
        }
        self.state
            .select(if self.entries.is_empty() { None } else { Some(0) });
    }

    fn enter_directory(&mut self, directory: PathBuf) {
        let came_from = self
            .directory
            .file_name()
            .map(|name| name.to_string_lossy().to_string());
        let going_up = self.directory.parent() == Some(directory.as_path());
        self.directory = directory;
        self.refresh();
        if going_up {
            if let Some(name) = came_from {
                self.select_name(&name);
            }
        }
    }

    fn next(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < self.entries.len() => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    fn previous(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => self.entries.len() - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<FileBrowserAction> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => Some(FileBrowserAction::Close),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(FileBrowserAction::Close)
            }
            KeyCode::Char('j') | KeyCode::Down => {
                self.next();
                None
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.previous();
                None
            }
            KeyCode::Char('g') | KeyCode::Home => {
                if !self.entries.is_empty() {
                    self.state.select(Some(0));
                }
                None
            }
            KeyCode::Char('G') | KeyCode::End => {
                if !self.entries.is_empty() {
                    self.state.select(Some(self.entries.len() - 1));
                }
                None
            }
            KeyCode::Char('.') => {
                self.show_hidden = !self.show_hidden;
                self.refresh();
                None
            }
            KeyCode::Backspace | KeyCode::Char('h') | KeyCode::Left => {
                if let Some(parent) = self.directory.parent().map(Path::to_path_buf) {
                    self.enter_directory(parent);
                }
                None
            }
            KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => {
                let entry = self.selected()?.clone();
                if entry.is_dir {
                    self.enter_directory(entry.path);
                    None
                } else {
                    Some(FileBrowserAction::Open(entry.path))
                }
            }
            _ => None,
        }
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect, palette: &Base16Palette) {
        let popup_area = centered_rect(60, 80, area);
        f.render_widget(Clear, popup_area);

        let items: Vec<ListItem> = match &self.error {
            Some(error) if self.entries.len() <= 1 => {
                let mut items: Vec<ListItem> =
                    self.entries.iter().map(|e| entry_item(e, palette)).collect();
                items.push(ListItem::new(Line::from(Span::styled(
                    format!("  {error}"),
                    Style::default().fg(palette.base_08),
                ))));
                items
            }
            _ => self.entries.iter().map(|e| entry_item(e, palette)).collect(),
        };

        let title = format!(" Open - {} ", self.directory.display());
        let list = List::new(items)
            .block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(palette.base_0c))
                    .style(Style::default().bg(palette.base_00)),
            )
            .highlight_style(
                Style::default()
                    .bg(palette.base_02)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");

        f.render_stateful_widget(list, popup_area, &mut self.state);
    }
}

fn entry_item<'a>(entry: &'a BrowserEntry, palette: &Base16Palette) -> ListItem<'a> {
    if entry.is_dir {
        ListItem::new(Line::from(Span::styled(
            format!("{}/", entry.name),
            Style::default().fg(palette.base_0d),
        )))
    } else {
        ListItem::new(Line::from(Span::styled(
            entry.name.as_str(),
            Style::default().fg(palette.base_05),
        )))
    }
}

/// Directories first, then files, each sorted case-insensitively.
pub fn list_directory(directory: &Path, show_hidden: bool) -> std::io::Result<Vec<BrowserEntry>> {
    let mut entries: Vec<BrowserEntry> = std::fs::read_dir(directory)?
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let name = entry.file_name().to_string_lossy().to_string();
            if !show_hidden && name.starts_with('.') {
                return None;
            }
            let path = entry.path();
            // Follow symlinks so linked directories can be entered.
            let is_dir = path.is_dir();
            Some(BrowserEntry { path, name, is_dir })
        })
        .collect();
    entries.sort_by(|a, b| {
        b.is_dir
            .cmp(&a.is_dir)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventKind;
    use crossterm::event::KeyEventState;
    use tempfile::TempDir;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::empty(),
            kind: KeyEventKind::Press,
            state: KeyEventState::empty(),
        }
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("notes")).unwrap();
        std::fs::write(dir.path().join("notes").join("inner.txt"), "x").unwrap();
        std::fs::write(dir.path().join("b.csv"), "a,b").unwrap();
        std::fs::write(dir.path().join("A.json"), "{}").unwrap();
        std::fs::write(dir.path().join(".hidden"), "").unwrap();
        dir
    }

    #[test]
    fn directories_sort_first_and_hidden_files_are_skipped() {
        let dir = fixture();
        let names: Vec<_> = list_directory(dir.path(), false)
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, ["notes", "A.json", "b.csv"]);
        assert_eq!(list_directory(dir.path(), true).unwrap().len(), 4);
    }

    #[test]
    fn enter_opens_files_and_descends_into_directories() {
        let dir = fixture();
        let mut browser = FileBrowser::new(dir.path());
        assert!(browser.select_name("notes"));
        assert!(browser.handle_key(key(KeyCode::Enter)).is_none());
        assert_eq!(browser.directory(), dir.path().join("notes"));

        assert!(browser.select_name("inner.txt"));
        match browser.handle_key(key(KeyCode::Enter)) {
            Some(FileBrowserAction::Open(path)) => {
                assert_eq!(path, dir.path().join("notes").join("inner.txt"))
            }
            _ => panic!("expected an open request"),
        }
    }

    #[test]
    fn going_up_reselects_the_directory_we_left() {
        let dir = fixture();
        let mut browser = FileBrowser::new(&dir.path().join("notes"));
        browser.handle_key(key(KeyCode::Backspace));
        assert_eq!(browser.directory(), dir.path());
        assert_eq!(browser.selected().map(|e| e.name.as_str()), Some("notes"));
    }

    #[test]
    fn unreadable_directory_still_offers_parent() {
        let dir = TempDir::new().unwrap();
        let browser = FileBrowser::new(&dir.path().join("missing"));
        assert_eq!(browser.entries().len(), 1);
        assert_eq!(browser.entries()[0].name, "..");
    }
}
