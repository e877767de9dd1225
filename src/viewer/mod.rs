//! The contract between the host window and a format viewer.
//!
//! A viewer is bound to one document for its whole life. The host creates it
//! through the plugin registry, hands it the file in [`Viewer::init`], polls
//! it until the background load settles, and drops it on close or replace.
//! Everything a viewer may do to the host goes through [`HostContext`].

pub mod base;
pub mod file;
pub mod host;
pub mod nav;
#[cfg(feature = "print")]
pub mod print;
pub mod state;
pub mod task;
pub mod toolbar;

use crossterm::event::KeyEvent;
use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::theme::Base16Palette;

pub use base::ViewerBase;
pub use file::DocumentFile;
pub use host::HostContext;
#[cfg(feature = "print")]
pub use print::{PrintError, PrintStatus, Printer};
pub use task::{CancelToken, LoadError, LoadTask};

/// Where a viewer's background load stands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadProgress {
    Pending,
    Loaded,
    Failed,
}

/// One line of the secondary navigation panel
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverviewEntry {
    pub title: String,
    pub depth: usize,
}

impl OverviewEntry {
    pub fn new(title: impl Into<String>, depth: usize) -> Self {
        Self {
            title: title.into(),
            depth,
        }
    }
}

pub trait Viewer {
    /// Stable identifier used in logs, menus and status contexts
    fn viewer_name(&self) -> &str;

    /// Media types this viewer renders; never empty
    fn supported_media_types(&self) -> Vec<String>;

    /// Bind to `file` and start loading it.
    ///
    /// Must not assume the file is readable. Failures end up in the no-content
    /// state and are reported through the host's status channel.
    fn init(&mut self, file: DocumentFile, host: &mut HostContext<'_>);

    /// Called by the host every tick until it returns something other than
    /// [`LoadProgress::Pending`].
    fn poll_load(&mut self, host: &mut HostContext<'_>) -> LoadProgress;

    fn has_content(&self) -> bool;

    fn save_state(&self) -> Vec<u8> {
        Vec::new()
    }

    /// Apply a blob from [`Viewer::save_state`]. A blob with another version
    /// tag, or one that fails to parse, leaves the viewer untouched.
    fn restore_state(&mut self, _blob: &[u8]) -> bool {
        false
    }

    fn supports_overview(&self) -> bool {
        false
    }

    fn overview(&self) -> Vec<OverviewEntry> {
        Vec::new()
    }

    fn jump_to_overview(&mut self, _index: usize) -> bool {
        false
    }

    fn handle_key(&mut self, _key: KeyEvent, _host: &mut HostContext<'_>) -> bool {
        false
    }

    /// Run a toolbar action this viewer contributed.
    fn trigger_action(&mut self, _id: &str, _host: &mut HostContext<'_>) -> bool {
        false
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, palette: &Base16Palette);

    #[cfg(feature = "print")]
    fn supports_printing(&self) -> bool {
        false
    }

    #[cfg(feature = "print")]
    fn print_document(&self, _printer: &mut Printer) -> Result<(), PrintError> {
        Err(PrintError::Unsupported {
            viewer: self.viewer_name().to_string(),
        })
    }

    /// Print the document, reporting each stage through the status channel.
    #[cfg(feature = "print")]
    fn print(&self, mut printer: Printer, host: &mut HostContext<'_>) -> PrintStatus {
        let context = "print";
        host.status_message(
            format!("Printing to {}", printer.output_path().display()),
            context,
        );
        log::debug!("{} print status: {:?}", self.viewer_name(), PrintStatus::InProgress);

        if !self.supports_printing() {
            let err = PrintError::Unsupported {
                viewer: self.viewer_name().to_string(),
            };
            host.status_error(err.to_string(), context);
            return PrintStatus::Error(err.to_string());
        }

        let output = printer.output_path().to_path_buf();
        let outcome = self
            .print_document(&mut printer)
            .and_then(|()| printer.finish());
        match outcome {
            Ok(pages) => {
                host.status_message(
                    format!("Printed {pages} page(s) to {}", output.display()),
                    context,
                );
                PrintStatus::Success
            }
            Err(e) => {
                log::error!("{} failed to print: {e}", self.viewer_name());
                host.status_error(format!("Printing failed: {e}"), context);
                PrintStatus::Error(e.to_string())
            }
        }
    }
}

/// Centered message used by viewers with nothing to show yet.
pub fn render_placeholder(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    message: &str,
    palette: &Base16Palette,
) {
    let (text_color, border_color, bg_color) = palette.get_panel_colors(false);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {title} "))
        .border_style(Style::default().fg(border_color))
        .style(Style::default().bg(bg_color));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let top = inner.y + inner.height / 2;
    let line_area = Rect::new(
        inner.x,
        top,
        inner.width,
        inner.height.saturating_sub(top - inner.y),
    );
    let paragraph = Paragraph::new(message.to_string())
        .style(Style::default().fg(text_color))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, line_area);
}
