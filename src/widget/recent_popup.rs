use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState},
};

use crate::recent::RecentFiles;
use crate::theme::Base16Palette;

use super::centered_rect;

pub enum RecentPopupAction {
    Close,
    Open(PathBuf),
}

#[derive(Clone)]
struct RecentItem {
    date: DateTime<Local>,
    title: String,
    path: PathBuf,
}

/// Recently opened documents, newest first.
pub struct RecentPopup {
    items: Vec<RecentItem>,
    state: ListState,
}

impl RecentPopup {
    pub fn new(recent: &RecentFiles) -> Self {
        let items: Vec<RecentItem> = recent
            .entries()
            .iter()
            .map(|entry| RecentItem {
                date: entry.last_opened.with_timezone(&Local),
                title: entry.title(),
                path: entry.path.clone(),
            })
            .collect();

        let mut state = ListState::default();
        if !items.is_empty() {
            state.select(Some(0));
        }

        RecentPopup { items, state }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect, palette: &Base16Palette) {
        let popup_area = centered_rect(60, 80, area);
        f.render_widget(Clear, popup_area);

        let items: Vec<ListItem> = if self.items.is_empty() {
            vec![ListItem::new(Line::from(Span::styled(
                "No recent files",
                Style::default().fg(palette.base_03),
            )))]
        } else {
            self.items
                .iter()
                .map(|item| {
                    let date_str = item.date.format("%Y-%m-%d %H:%M").to_string();
                    ListItem::new(Line::from(vec![
                        Span::styled(date_str, Style::default().fg(palette.base_03)),
                        Span::raw(" : "),
                        Span::styled(&item.title, Style::default().fg(palette.base_05)),
                    ]))
                })
                .collect()
        };

        let list = List::new(items)
            .block(
                Block::default()
                    .title(" Recent Files ")
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

    pub fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < self.items.len() => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => self.items.len() - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn selected_path(&self) -> Option<&Path> {
        self.state
            .selected()
            .and_then(|i| self.items.get(i))
            .map(|item| item.path.as_path())
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<RecentPopupAction> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('r') => {
                Some(RecentPopupAction::Close)
            }
            KeyCode::Char('j') | KeyCode::Down => {
                self.next();
                None
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.previous();
                None
            }
            KeyCode::Enter => self
                .selected_path()
                .map(|path| RecentPopupAction::Open(path.to_path_buf())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_wraps_and_follows_recency() {
        let mut recent = RecentFiles::with_capacity(5);
        for name in ["/a.txt", "/b.txt", "/c.txt"] {
            recent.touch(Path::new(name));
        }
        let mut popup = RecentPopup::new(&recent);
        assert_eq!(popup.selected_path(), Some(Path::new("/c.txt")));

        popup.previous();
        assert_eq!(popup.selected_path(), Some(Path::new("/a.txt")));
        popup.next();
        assert_eq!(popup.selected_path(), Some(Path::new("/c.txt")));
    }

    #[test]
    fn empty_list_has_no_selection() {
        let mut popup = RecentPopup::new(&RecentFiles::default());
        popup.next();
        assert!(popup.is_empty());
        assert!(popup.selected_path().is_none());
    }
}
