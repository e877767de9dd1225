use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Cell, Row, Table};
use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

use crate::theme::Base16Palette;
use crate::viewer::nav::ScrollState;
use crate::viewer::state::{decode_state, encode_state};
use crate::viewer::task::{CancelToken, LoadError, read_to_end_cancellable};
use crate::viewer::{DocumentFile, HostContext, LoadProgress, OverviewEntry, Viewer, ViewerBase};

use super::{document_block, render_empty};

pub const CSV_VIEWER_NAME: &str = "CSV Viewer";
const STATE_VERSION: u32 = 1;
const MAX_CSV_BYTES: u64 = 256 * 1024 * 1024;
const MAX_COLUMN_WIDTH: usize = 40;
const CANCEL_CHECK_INTERVAL: usize = 4096;

/// Parsed table. Rows are padded to the header width.
#[derive(Debug, Default)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub widths: Vec<usize>,
    pub delimiter: u8,
}

impl CsvTable {
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Guess the delimiter from the first line; `.tsv` files are always tabs.
    fn sniff_delimiter(bytes: &[u8], extension: Option<&str>) -> u8 {
        if extension == Some("tsv") {
            return b'\t';
        }
        let first_line = bytes.split(|&b| b == b'\n').next().unwrap_or_default();
        [b',', b';', b'\t', b'|']
            .into_iter()
            .map(|d| (d, first_line.iter().filter(|&&b| b == d).count()))
            .filter(|&(_, count)| count > 0)
            .max_by_key(|&(_, count)| count)
            .map(|(d, _)| d)
            .unwrap_or(b',')
    }

    fn parse(
        bytes: &[u8],
        extension: Option<&str>,
        token: &CancelToken,
    ) -> Result<Self, LoadError> {
        let delimiter = Self::sniff_delimiter(bytes, extension);
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let mut headers: Vec<String> = reader
            .headers()
            .map_err(|e| LoadError::parse(format!("invalid CSV header: {e}")))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            if index % CANCEL_CHECK_INTERVAL == 0 && token.is_cancelled() {
                return Err(LoadError::Cancelled);
            }
            let record = record.map_err(|e| LoadError::parse(format!("invalid CSV: {e}")))?;
            let row: Vec<String> = record.iter().map(str::to_string).collect();
            while headers.len() < row.len() {
                headers.push(format!("column {}", headers.len() + 1));
            }
            rows.push(row);
        }
        if headers.is_empty() {
            return Err(LoadError::parse("no columns"));
        }

        for row in &mut rows {
            row.resize(headers.len(), String::new());
        }
        let widths = (0..headers.len())
            .map(|col| {
                rows.iter()
                    .map(|row| row[col].width())
                    .chain(std::iter::once(headers[col].width()))
                    .max()
                    .unwrap_or(1)
                    .clamp(1, MAX_COLUMN_WIDTH)
            })
            .collect();

        Ok(Self {
            headers,
            rows,
            widths,
            delimiter,
        })
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct CsvState {
    selected: usize,
    first_column: usize,
}

pub struct CsvViewer {
    base: ViewerBase<CsvTable>,
    table: Option<CsvTable>,
    selected: usize,
    first_column: usize,
    scroll: ScrollState,
}

impl Default for CsvViewer {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvViewer {
    pub fn new() -> Self {
        Self {
            base: ViewerBase::new(CSV_VIEWER_NAME),
            table: None,
            selected: 0,
            first_column: 0,
            scroll: ScrollState::default(),
        }
    }

    pub fn table(&self) -> Option<&CsvTable> {
        self.table.as_ref()
    }

    pub fn selected_row(&self) -> usize {
        self.selected
    }

    pub fn first_column(&self) -> usize {
        self.first_column
    }

    fn row_count(&self) -> usize {
        self.table.as_ref().map_or(0, |t| t.rows.len())
    }

    fn select(&mut self, index: usize) {
        self.selected = index.min(self.row_count().saturating_sub(1));
        self.scroll.reveal(self.selected);
    }

    fn set_first_column(&mut self, column: usize) {
        let columns = self.table.as_ref().map_or(0, CsvTable::column_count);
        self.first_column = column.min(columns.saturating_sub(1));
    }
}

impl Viewer for CsvViewer {
    fn viewer_name(&self) -> &str {
        CSV_VIEWER_NAME
    }

    fn supported_media_types(&self) -> Vec<String> {
        vec![
            "text/csv".to_string(),
            "text/tab-separated-values".to_string(),
            "application/csv".to_string(),
        ]
    }

    fn init(&mut self, file: DocumentFile, host: &mut HostContext<'_>) {
        let extension = file.extension();
        self.base.bind(file);
        host.toolbar().set_title(CSV_VIEWER_NAME);

        self.base.begin_load(host, move |file, token| {
            let bytes = read_to_end_cancellable(file, token, Some(MAX_CSV_BYTES))?;
            CsvTable::parse(&bytes, extension.as_deref(), token)
        });
    }

    fn poll_load(&mut self, host: &mut HostContext<'_>) -> LoadProgress {
        let name = self.base.file_name();
        let slot = &mut self.table;
        let scroll = &mut self.scroll;
        let progress = self.base.poll_load(host, |table, host| {
            scroll.set_len(table.rows.len());
            host.status_message(
                format!(
                    "Opened \"{name}\", {} rows x {} columns",
                    table.rows.len(),
                    table.column_count()
                ),
                CSV_VIEWER_NAME,
            );
            *slot = Some(table);
            Ok(())
        });
        #[cfg(feature = "print")]
        self.base.maybe_enable_printing(self.table.is_some());
        progress
    }

    fn has_content(&self) -> bool {
        self.table.is_some()
    }

    fn save_state(&self) -> Vec<u8> {
        encode_state(
            STATE_VERSION,
            &CsvState {
                selected: self.selected,
                first_column: self.first_column,
            },
        )
    }

    fn restore_state(&mut self, blob: &[u8]) -> bool {
        let Some(state) = decode_state::<CsvState>(blob, STATE_VERSION) else {
            return false;
        };
        self.select(state.selected);
        self.set_first_column(state.first_column);
        true
    }

    fn supports_overview(&self) -> bool {
        true
    }

    fn overview(&self) -> Vec<OverviewEntry> {
        self.table
            .as_ref()
            .map(|table| {
                table
                    .headers
                    .iter()
                    .map(|header| OverviewEntry::new(header.clone(), 0))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn jump_to_overview(&mut self, index: usize) -> bool {
        let columns = self.table.as_ref().map_or(0, CsvTable::column_count);
        if index >= columns {
            return false;
        }
        self.first_column = index;
        true
    }

    fn handle_key(&mut self, key: KeyEvent, _host: &mut HostContext<'_>) -> bool {
        if self.table.is_none() {
            return false;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let half = (self.scroll.viewport() / 2).max(1);
        match key.code {
            KeyCode::Char('j') | KeyCode::Down if !ctrl => self.select(self.selected + 1),
            KeyCode::Char('k') | KeyCode::Up if !ctrl => {
                self.select(self.selected.saturating_sub(1))
            }
            KeyCode::Char('d') if ctrl => self.select(self.selected + half),
            KeyCode::Char('u') if ctrl => self.select(self.selected.saturating_sub(half)),
            KeyCode::Char('g') | KeyCode::Home => self.select(0),
            KeyCode::Char('G') | KeyCode::End => self.select(usize::MAX),
            KeyCode::Char('l') | KeyCode::Right => self.set_first_column(self.first_column + 1),
            KeyCode::Char('h') | KeyCode::Left => {
                self.set_first_column(self.first_column.saturating_sub(1))
            }
            _ => return false,
        }
        true
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, palette: &Base16Palette) {
        let Some(table) = &self.table else {
            return render_empty(&self.base, frame, area, palette);
        };

        let title = format!(
            "{} [{}/{}]",
            self.base.file_name(),
            (self.selected + 1).min(table.rows.len()),
            table.rows.len()
        );
        let block = document_block(&title, palette);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        // One line goes to the header.
        self.scroll.set_viewport(inner.height.saturating_sub(1) as usize);
        self.scroll.reveal(self.selected);

        let columns = self.first_column..table.column_count();
        let header = Row::new(
            table.headers[columns.clone()]
                .iter()
                .map(|h| Cell::from(h.as_str())),
        )
        .style(
            Style::default()
                .fg(palette.base_0d)
                .add_modifier(Modifier::BOLD),
        );

        let (selection_bg, selection_fg) = palette.get_selection_colors(true);
        let rows: Vec<Row> = table
            .rows
            .iter()
            .enumerate()
            .skip(self.scroll.offset())
            .take(self.scroll.viewport())
            .map(|(index, row)| {
                let cells = row[columns.clone()].iter().map(|c| Cell::from(c.as_str()));
                let style = if index == self.selected {
                    Style::default().bg(selection_bg).fg(selection_fg)
                } else {
                    Style::default().fg(palette.base_05)
                };
                Row::new(cells).style(style)
            })
            .collect();

        let widths: Vec<Constraint> = table.widths[columns]
            .iter()
            .map(|&w| Constraint::Length(w as u16))
            .collect();
        let widget = Table::new(rows, widths).header(header).column_spacing(2);
        frame.render_widget(widget, inner);
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
        let table = self
            .table
            .as_ref()
            .ok_or(crate::viewer::PrintError::NoContent)?;
        let format_row = |cells: &[String]| {
            cells
                .iter()
                .zip(&table.widths)
                .map(|(cell, &width)| {
                    let pad = width.saturating_sub(cell.width());
                    format!("{cell}{}", " ".repeat(pad))
                })
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };
        printer.print_line(&format_row(&table.headers));
        for row in &table.rows {
            printer.print_line(&format_row(row));
        }
        Ok(())
    }
}
