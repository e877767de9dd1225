pub mod file_browser;
pub mod overview_panel;
pub mod recent_popup;

use ratatui::layout::{Constraint, Direction, Layout, Rect};

pub use file_browser::{FileBrowser, FileBrowserAction};
pub use overview_panel::OverviewPanel;
pub use recent_popup::{RecentPopup, RecentPopupAction};

pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
