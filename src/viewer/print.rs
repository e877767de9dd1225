//! Text printing.
//!
//! The "printer" is a paginated plain-text sink: viewers feed it lines and it
//! writes pages separated by form feeds. The output file is replaced
//! atomically, so a failed print never leaves half a document behind.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};
use unicode_width::UnicodeWidthChar;

pub const DEFAULT_PAGE_WIDTH: usize = 80;
pub const DEFAULT_LINES_PER_PAGE: usize = 60;
const PAGE_BREAK: char = '\u{c}';

/// Outcome reported through the status side channel
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrintStatus {
    InProgress,
    Success,
    Error(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PrintError {
    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("nothing to print")]
    NoContent,

    #[error("{viewer} does not support printing")]
    Unsupported { viewer: String },
}

pub struct Printer {
    output: PathBuf,
    page_width: usize,
    lines_per_page: usize,
    pages: Vec<Vec<String>>,
}

impl Printer {
    pub fn to_file(output: impl Into<PathBuf>) -> Self {
        Self::with_page_size(output, DEFAULT_PAGE_WIDTH, DEFAULT_LINES_PER_PAGE)
    }

    pub fn with_page_size(
        output: impl Into<PathBuf>,
        page_width: usize,
        lines_per_page: usize,
    ) -> Self {
        Self {
            output: output.into(),
            page_width: page_width.max(1),
            lines_per_page: lines_per_page.max(1),
            pages: vec![Vec::new()],
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    pub fn page_width(&self) -> usize {
        self.page_width
    }

    /// Start a new page unless the current one is still empty.
    pub fn new_page(&mut self) {
        if self.pages.last().is_some_and(|page| !page.is_empty()) {
            self.pages.push(Vec::new());
        }
    }

    /// Print one logical line, wrapping it at the page width.
    pub fn print_line(&mut self, line: &str) {
        for physical in wrap_to_width(line, self.page_width) {
            if self
                .pages
                .last()
                .is_some_and(|page| page.len() >= self.lines_per_page)
            {
                self.pages.push(Vec::new());
            }
            if let Some(page) = self.pages.last_mut() {
                page.push(physical);
            }
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.iter().filter(|page| !page.is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.page_count() == 0
    }

    /// Write all pages to the output file, returning the page count.
    pub fn finish(self) -> Result<usize, PrintError> {
        if self.is_empty() {
            return Err(PrintError::NoContent);
        }
        let dir = match self.output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        let pages: Vec<&Vec<String>> = self.pages.iter().filter(|p| !p.is_empty()).collect();
        for (index, page) in pages.iter().enumerate() {
            if index > 0 {
                write!(tmp, "{PAGE_BREAK}")?;
            }
            for line in page.iter() {
                writeln!(tmp, "{line}")?;
            }
        }
        tmp.flush()?;
        tmp.persist(&self.output).map_err(|e| PrintError::Io(e.error))?;

        debug!("Wrote {} page(s) to {:?}", pages.len(), self.output);
        info!("Printed to {:?}", self.output);
        Ok(pages.len())
    }
}

fn wrap_to_width(line: &str, width: usize) -> Vec<String> {
    let mut wrapped = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;
    for ch in line.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if current_width + ch_width > width && !current.is_empty() {
            wrapped.push(std::mem::take(&mut current));
            current_width = 0;
        }
        current.push(ch);
        current_width += ch_width;
    }
    wrapped.push(current);
    wrapped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_lines_wrap_at_page_width() {
        assert_eq!(wrap_to_width("abcdef", 4), vec!["abcd", "ef"]);
        assert_eq!(wrap_to_width("", 4), vec![""]);
    }

    #[test]
    fn pages_break_after_line_limit() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("out.txt");
        let mut printer = Printer::with_page_size(&out, 10, 2);
        for line in ["one", "two", "three"] {
            printer.print_line(line);
        }
        assert_eq!(printer.page_count(), 2);
        assert_eq!(printer.finish().unwrap(), 2);

        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(written, "one\ntwo\n\u{c}three\n");
    }

    #[test]
    fn empty_printer_reports_no_content() {
        let dir = tempfile::TempDir::new().unwrap();
        let printer = Printer::to_file(dir.path().join("out.txt"));
        assert!(matches!(printer.finish(), Err(PrintError::NoContent)));
    }

    #[test]
    fn new_page_skips_empty_pages() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut printer = Printer::to_file(dir.path().join("out.txt"));
        printer.new_page();
        printer.print_line("a");
        printer.new_page();
        printer.new_page();
        printer.print_line("b");
        assert_eq!(printer.page_count(), 2);
    }
}
