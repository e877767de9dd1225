use crossterm::event::KeyEvent;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};
use serde::{Deserialize, Serialize};

use crate::theme::Base16Palette;
use crate::viewer::nav::ScrollState;
use crate::viewer::state::{decode_state, encode_state};
use crate::viewer::task::read_to_end_cancellable;
use crate::viewer::{DocumentFile, HostContext, LoadProgress, Viewer, ViewerBase};

use super::{document_block, render_empty};

pub const TEXT_VIEWER_NAME: &str = "Text Viewer";
const STATE_VERSION: u32 = 1;
const MAX_TEXT_BYTES: u64 = 64 * 1024 * 1024;
const TAB: &str = "    ";

const ACTION_WRAP: &str = "wrap";
const ACTION_LINE_NUMBERS: &str = "line-numbers";

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct TextState {
    offset: usize,
    wrap: bool,
    line_numbers: bool,
}

pub struct TextViewer {
    base: ViewerBase<Vec<String>>,
    lines: Option<Vec<String>>,
    scroll: ScrollState,
    wrap: bool,
    line_numbers: bool,
}

impl Default for TextViewer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextViewer {
    pub fn new() -> Self {
        Self {
            base: ViewerBase::new(TEXT_VIEWER_NAME),
            lines: None,
            scroll: ScrollState::default(),
            wrap: false,
            line_numbers: true,
        }
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll.offset()
    }

    pub fn line_count(&self) -> usize {
        self.lines.as_ref().map_or(0, Vec::len)
    }

    fn split_lines(bytes: &[u8]) -> Vec<String> {
        String::from_utf8_lossy(bytes)
            .lines()
            .map(|line| line.replace('\t', TAB))
            .collect()
    }

    fn gutter_width(&self) -> usize {
        self.line_count().max(1).to_string().len()
    }
}

impl Viewer for TextViewer {
    fn viewer_name(&self) -> &str {
        TEXT_VIEWER_NAME
    }

    fn supported_media_types(&self) -> Vec<String> {
        [
            "text/plain",
            "text/markdown",
            "text/x-log",
            "text/x-rust",
            "application/toml",
            "application/x-yaml",
        ]
        .iter()
        .map(|m| m.to_string())
        .collect()
    }

    fn init(&mut self, file: DocumentFile, host: &mut HostContext<'_>) {
        self.base.bind(file);
        host.toolbar().set_title(TEXT_VIEWER_NAME);
        host.toolbar().add_action(ACTION_WRAP, "Wrap", 'w');
        host.toolbar().add_action(ACTION_LINE_NUMBERS, "Numbers", 'n');

        self.base.begin_load(host, |file, token| {
            let bytes = read_to_end_cancellable(file, token, Some(MAX_TEXT_BYTES))?;
            Ok(Self::split_lines(&bytes))
        });
    }

    fn poll_load(&mut self, host: &mut HostContext<'_>) -> LoadProgress {
        let name = self.base.file_name();
        let lines = &mut self.lines;
        let scroll = &mut self.scroll;
        let progress = self.base.poll_load(host, |loaded, host| {
            scroll.set_len(loaded.len());
            host.status_message(
                format!("Opened \"{name}\", {} lines", loaded.len()),
                TEXT_VIEWER_NAME,
            );
            *lines = Some(loaded);
            Ok(())
        });
        #[cfg(feature = "print")]
        self.base.maybe_enable_printing(self.lines.is_some());
        progress
    }

    fn has_content(&self) -> bool {
        self.lines.is_some()
    }

    fn save_state(&self) -> Vec<u8> {
        encode_state(
            STATE_VERSION,
            &TextState {
                offset: self.scroll.offset(),
                wrap: self.wrap,
                line_numbers: self.line_numbers,
            },
        )
    }

    fn restore_state(&mut self, blob: &[u8]) -> bool {
        let Some(state) = decode_state::<TextState>(blob, STATE_VERSION) else {
            return false;
        };
        self.scroll.set_offset(state.offset);
        self.wrap = state.wrap;
        self.line_numbers = state.line_numbers;
        true
    }

    fn handle_key(&mut self, key: KeyEvent, _host: &mut HostContext<'_>) -> bool {
        self.lines.is_some() && self.scroll.handle_key(key)
    }

    fn trigger_action(&mut self, id: &str, host: &mut HostContext<'_>) -> bool {
        match id {
            ACTION_WRAP => {
                self.wrap = !self.wrap;
                let state = if self.wrap { "on" } else { "off" };
                self.base.status_message(host, format!("Line wrap {state}"));
                true
            }
            ACTION_LINE_NUMBERS => {
                self.line_numbers = !self.line_numbers;
                true
            }
            _ => false,
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, palette: &Base16Palette) {
        let Some(lines) = &self.lines else {
            return render_empty(&self.base, frame, area, palette);
        };

        let title = self.base.file_name();
        let block = document_block(&title, palette);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        self.scroll.set_viewport(inner.height as usize);

        let gutter = self.gutter_width();
        let visible: Vec<Line> = lines
            .iter()
            .enumerate()
            .skip(self.scroll.offset())
            .take(inner.height as usize)
            .map(|(index, text)| {
                let mut spans = Vec::with_capacity(2);
                if self.line_numbers {
                    spans.push(Span::styled(
                        format!("{:>gutter$} ", index + 1),
                        Style::default().fg(palette.base_03),
                    ));
                }
                spans.push(Span::styled(text.as_str(), Style::default().fg(palette.base_05)));
                Line::from(spans)
            })
            .collect();

        let mut paragraph = Paragraph::new(visible);
        if self.wrap {
            paragraph = paragraph.wrap(Wrap { trim: false });
        }
        frame.render_widget(paragraph, inner);
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
        let lines = self
            .lines
            .as_ref()
            .ok_or(crate::viewer::PrintError::NoContent)?;
        for line in lines {
            printer.print_line(line);
        }
        Ok(())
    }
}
