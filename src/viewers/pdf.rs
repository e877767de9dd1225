use crossterm::event::KeyEvent;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::widgets::Paragraph;
use serde::{Deserialize, Serialize};

use crate::theme::Base16Palette;
use crate::viewer::nav::ScrollState;
use crate::viewer::state::{decode_state, encode_state};
use crate::viewer::task::{LoadError, read_to_end_cancellable};
use crate::viewer::{DocumentFile, HostContext, LoadProgress, OverviewEntry, Viewer, ViewerBase};

use super::{document_block, render_empty};

pub const PDF_VIEWER_NAME: &str = "PDF Viewer";
const STATE_VERSION: u32 = 1;
const MAX_PDF_BYTES: u64 = 512 * 1024 * 1024;

const ACTION_PREV_PAGE: &str = "prev-page";
const ACTION_NEXT_PAGE: &str = "next-page";

/// Lines of one extracted page without the blank lines around them.
pub fn page_lines(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    let start = lines.iter().position(|l| !l.is_empty()).unwrap_or(lines.len());
    let end = lines.iter().rposition(|l| !l.is_empty()).map_or(start, |i| i + 1);
    lines[start..end].iter().map(|l| l.to_string()).collect()
}

fn extract_pages(bytes: &[u8]) -> Result<Vec<Vec<String>>, LoadError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| LoadError::parse(format!("cannot read PDF: {e}")))?;
    if pages.is_empty() {
        return Err(LoadError::parse("PDF has no pages"));
    }
    Ok(pages.iter().map(|page| page_lines(page)).collect())
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct PdfState {
    page: usize,
    offset: usize,
}

/// Text of a PDF, one page at a time. Pages are not rasterised.
pub struct PdfViewer {
    base: ViewerBase<Vec<Vec<String>>>,
    pages: Option<Vec<Vec<String>>>,
    page: usize,
    scroll: ScrollState,
}

impl Default for PdfViewer {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfViewer {
    pub fn new() -> Self {
        Self {
            base: ViewerBase::new(PDF_VIEWER_NAME),
            pages: None,
            page: 0,
            scroll: ScrollState::default(),
        }
    }

    pub fn current_page(&self) -> usize {
        self.page
    }

    pub fn page_count(&self) -> usize {
        self.pages.as_ref().map_or(0, Vec::len)
    }

    pub fn page(&self, index: usize) -> Option<&[String]> {
        self.pages.as_ref()?.get(index).map(Vec::as_slice)
    }

    fn go_to_page(&mut self, page: usize) -> bool {
        let Some(pages) = &self.pages else {
            return false;
        };
        if page >= pages.len() {
            return false;
        }
        self.page = page;
        self.scroll.set_len(pages[page].len());
        self.scroll.to_top();
        true
    }

    fn sync_actions(&self, host: &mut HostContext<'_>) {
        let toolbar = host.toolbar();
        toolbar.set_enabled(ACTION_PREV_PAGE, self.page > 0);
        toolbar.set_enabled(ACTION_NEXT_PAGE, self.page + 1 < self.page_count());
    }
}

impl Viewer for PdfViewer {
    fn viewer_name(&self) -> &str {
        PDF_VIEWER_NAME
    }

    fn supported_media_types(&self) -> Vec<String> {
        vec!["application/pdf".to_string()]
    }

    fn init(&mut self, file: DocumentFile, host: &mut HostContext<'_>) {
        self.base.bind(file);
        let toolbar = host.toolbar();
        toolbar.set_title(PDF_VIEWER_NAME);
        toolbar.add_action(ACTION_PREV_PAGE, "Previous Page", '[');
        toolbar.add_action(ACTION_NEXT_PAGE, "Next Page", ']');
        self.sync_actions(host);

        self.base.begin_load(host, |file, token| {
            let bytes = read_to_end_cancellable(file, token, Some(MAX_PDF_BYTES))?;
            extract_pages(&bytes)
        });
    }

    fn poll_load(&mut self, host: &mut HostContext<'_>) -> LoadProgress {
        let name = self.base.file_name();
        let slot = &mut self.pages;
        let page = &mut self.page;
        let scroll = &mut self.scroll;
        let progress = self.base.poll_load(host, |pages, host| {
            host.status_message(
                format!("Opened \"{name}\", {} pages", pages.len()),
                PDF_VIEWER_NAME,
            );
            *page = 0;
            scroll.set_len(pages.first().map_or(0, Vec::len));
            scroll.to_top();
            *slot = Some(pages);
            Ok(())
        });
        if progress != LoadProgress::Pending {
            self.sync_actions(host);
        }
        #[cfg(feature = "print")]
        self.base.maybe_enable_printing(self.pages.is_some());
        progress
    }

    fn has_content(&self) -> bool {
        self.pages.is_some()
    }

    fn save_state(&self) -> Vec<u8> {
        encode_state(
            STATE_VERSION,
            &PdfState {
                page: self.page,
                offset: self.scroll.offset(),
            },
        )
    }

    fn restore_state(&mut self, blob: &[u8]) -> bool {
        let Some(state) = decode_state::<PdfState>(blob, STATE_VERSION) else {
            return false;
        };
        if !self.go_to_page(state.page) {
            return false;
        }
        self.scroll.set_offset(state.offset);
        true
    }

    fn supports_overview(&self) -> bool {
        true
    }

    fn overview(&self) -> Vec<OverviewEntry> {
        (0..self.page_count())
            .map(|page| OverviewEntry::new(format!("Page {}", page + 1), 0))
            .collect()
    }

    fn jump_to_overview(&mut self, index: usize) -> bool {
        self.go_to_page(index)
    }

    fn handle_key(&mut self, key: KeyEvent, _host: &mut HostContext<'_>) -> bool {
        self.pages.is_some() && self.scroll.handle_key(key)
    }

    fn trigger_action(&mut self, id: &str, host: &mut HostContext<'_>) -> bool {
        let moved = match id {
            ACTION_PREV_PAGE => self.page > 0 && self.go_to_page(self.page - 1),
            ACTION_NEXT_PAGE => self.go_to_page(self.page + 1),
            _ => return false,
        };
        self.sync_actions(host);
        moved
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, palette: &Base16Palette) {
        let Some(pages) = &self.pages else {
            return render_empty(&self.base, frame, area, palette);
        };

        let title = format!(
            "{} - page {}/{}",
            self.base.file_name(),
            self.page + 1,
            pages.len()
        );
        let block = document_block(&title, palette);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        self.scroll.set_viewport(inner.height as usize);

        let lines: Vec<Line> = pages
            .get(self.page)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .skip(self.scroll.offset())
            .take(inner.height as usize)
            .map(|line| Line::styled(line.as_str(), Style::default().fg(palette.base_05)))
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }

    #[cfg(feature = "print")]
    fn supports_printing(&self) -> bool {
        self.base.printing_enabled()
    }

    #[cfg(feature = "print")]
    fn print_document(
        &self,
        printer: &mut crate::viewer::Printer,
    ) -> Result<(), crate::viewer::PrintError> {
        let pages = self
            .pages
            .as_ref()
            .ok_or(crate::viewer::PrintError::NoContent)?;
        for page in pages {
            printer.new_page();
            for line in page {
                printer.print_line(line);
            }
        }
        Ok(())
    }
}
