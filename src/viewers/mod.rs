//! Format viewers compiled into the binary.

pub mod csv;
pub mod image;
pub mod json;
#[cfg(feature = "pdf")]
pub mod pdf;
pub mod text;

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders};

use crate::plugin::ViewerCatalog;
use crate::theme::Base16Palette;
use crate::viewer::{LoadProgress, Viewer, ViewerBase, render_placeholder};

pub use self::csv::CsvViewer;
pub use self::image::ImageViewer;
pub use self::json::JsonViewer;
#[cfg(feature = "pdf")]
pub use self::pdf::PdfViewer;
pub use self::text::TextViewer;

/// Register every built-in viewer with its bundled manifest.
///
/// Order matters: the text viewer claims the generic text types, so it goes
/// last and the structured formats win resolution.
pub fn register_builtin(catalog: &mut ViewerCatalog) {
    catalog.register_with_manifest("json", include_str!("../../plugins/json.json"), || {
        Ok(Box::new(JsonViewer::new()) as Box<dyn Viewer>)
    });
    catalog.register_with_manifest("csv", include_str!("../../plugins/csv.json"), || {
        Ok(Box::new(CsvViewer::new()) as Box<dyn Viewer>)
    });
    catalog.register_with_manifest("image", include_str!("../../plugins/image.json"), || {
        Ok(Box::new(ImageViewer::new()) as Box<dyn Viewer>)
    });
    #[cfg(feature = "pdf")]
    catalog.register_with_manifest("pdf", include_str!("../../plugins/pdf.json"), || {
        Ok(Box::new(PdfViewer::new()) as Box<dyn Viewer>)
    });
    catalog.register_with_manifest("text", include_str!("../../plugins/text.json"), || {
        Ok(Box::new(TextViewer::new()) as Box<dyn Viewer>)
    });
}

pub(crate) fn document_block<'a>(title: &'a str, palette: &Base16Palette) -> Block<'a> {
    let (_, border_color, bg_color) = palette.get_panel_colors(true);
    Block::default()
        .borders(Borders::ALL)
        .title(format!(" {title} "))
        .border_style(Style::default().fg(border_color))
        .style(Style::default().bg(bg_color))
}

/// Placeholder for a viewer that is still loading or failed to load.
pub(crate) fn render_empty<T>(
    base: &ViewerBase<T>,
    frame: &mut Frame,
    area: Rect,
    palette: &Base16Palette,
) {
    let message = match base.progress() {
        LoadProgress::Pending => "Loading...",
        LoadProgress::Loaded | LoadProgress::Failed => "No content",
    };
    let title = match base.file() {
        Some(file) => file.display_name(),
        None => base.name().to_string(),
    };
    render_placeholder(frame, area, &title, message, palette);
}
