use std::collections::BTreeSet;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::theme::Base16Palette;
use crate::viewer::nav::ScrollState;
use crate::viewer::state::{decode_state, encode_state};
use crate::viewer::task::{LoadError, read_to_end_cancellable};
use crate::viewer::{DocumentFile, HostContext, LoadProgress, OverviewEntry, Viewer, ViewerBase};

use super::{document_block, render_empty};

pub const JSON_VIEWER_NAME: &str = "JSON Viewer";
const STATE_VERSION: u32 = 1;
const MAX_JSON_BYTES: u64 = 256 * 1024 * 1024;
const PREVIEW_CHARS: usize = 60;

const ACTION_EXPAND_ALL: &str = "expand-all";
const ACTION_COLLAPSE_ALL: &str = "collapse-all";

/// One visible line of the tree
#[derive(Clone, Debug, PartialEq, Eq)]
struct TreeRow {
    pointer: String,
    depth: usize,
    label: String,
    summary: String,
    expandable: bool,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct JsonState {
    expanded: Vec<String>,
    selected: String,
}

fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn child_pointer(parent: &str, token: &str) -> String {
    format!("{parent}/{}", escape_token(token))
}

fn children(value: &Value) -> Vec<(String, &Value)> {
    match value {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => Vec::new(),
    }
}

fn summarize(value: &Value) -> String {
    match value {
        Value::Object(map) => format!("{{{}}}", map.len()),
        Value::Array(items) => format!("[{}]", items.len()),
        Value::String(s) => {
            let mut preview: String = s.chars().take(PREVIEW_CHARS).collect();
            if s.chars().count() > PREVIEW_CHARS {
                preview.push('…');
            }
            format!("\"{preview}\"")
        }
        other => other.to_string(),
    }
}

fn is_container(value: &Value) -> bool {
    match value {
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => false,
    }
}

/// Collapsible JSON tree. Expansion state is keyed by JSON pointer, so it
/// survives a reload of the same document.
pub struct JsonViewer {
    base: ViewerBase<Value>,
    root: Option<Value>,
    expanded: BTreeSet<String>,
    rows: Vec<TreeRow>,
    selected: usize,
    scroll: ScrollState,
}

impl Default for JsonViewer {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonViewer {
    pub fn new() -> Self {
        Self {
            base: ViewerBase::new(JSON_VIEWER_NAME),
            root: None,
            expanded: BTreeSet::from([String::new()]),
            rows: Vec::new(),
            selected: 0,
            scroll: ScrollState::default(),
        }
    }

    pub fn visible_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn selected_pointer(&self) -> Option<&str> {
        self.rows.get(self.selected).map(|row| row.pointer.as_str())
    }

    fn rebuild_rows(&mut self) {
        let selected = self.selected_pointer().map(str::to_string);
        self.rows.clear();
        if let Some(root) = &self.root {
            let mut rows = Vec::new();
            Self::flatten(root, String::new(), "$".to_string(), 0, &self.expanded, &mut rows);
            self.rows = rows;
        }
        self.scroll.set_len(self.rows.len());
        match selected {
            Some(pointer) => self.select_pointer(&pointer),
            None => self.select(0),
        }
    }

    fn flatten(
        value: &Value,
        pointer: String,
        label: String,
        depth: usize,
        expanded: &BTreeSet<String>,
        rows: &mut Vec<TreeRow>,
    ) {
        let expandable = is_container(value);
        let open = expandable && expanded.contains(&pointer);
        rows.push(TreeRow {
            pointer: pointer.clone(),
            depth,
            label,
            summary: summarize(value),
            expandable,
        });
        if open {
            for (token, child) in children(value) {
                let child_ptr = child_pointer(&pointer, &token);
                Self::flatten(child, child_ptr, token, depth + 1, expanded, rows);
            }
        }
    }

    fn select(&mut self, index: usize) {
        self.selected = index.min(self.rows.len().saturating_sub(1));
        self.scroll.reveal(self.selected);
    }

    /// Select `pointer`, or its nearest visible ancestor.
    fn select_pointer(&mut self, pointer: &str) {
        let mut candidate = pointer;
        loop {
            if let Some(index) = self.rows.iter().position(|row| row.pointer == candidate) {
                return self.select(index);
            }
            match candidate.rfind('/') {
                Some(cut) => candidate = &candidate[..cut],
                None => return self.select(0),
            }
        }
    }

    fn toggle_selected(&mut self) {
        let Some(row) = self.rows.get(self.selected) else {
            return;
        };
        if !row.expandable {
            return;
        }
        let pointer = row.pointer.clone();
        if !self.expanded.remove(&pointer) {
            self.expanded.insert(pointer);
        }
        self.rebuild_rows();
    }

    fn collapse_or_parent(&mut self) {
        let Some(row) = self.rows.get(self.selected) else {
            return;
        };
        let pointer = row.pointer.clone();
        if row.expandable && self.expanded.contains(&pointer) {
            self.expanded.remove(&pointer);
            self.rebuild_rows();
        } else if let Some(cut) = pointer.rfind('/') {
            self.select_pointer(&pointer[..cut]);
        }
    }

    fn expand_all(&mut self) {
        if let Some(root) = &self.root {
            let mut all = BTreeSet::new();
            Self::collect_containers(root, String::new(), &mut all);
            self.expanded = all;
        }
        self.rebuild_rows();
    }

    fn collapse_all(&mut self) {
        self.expanded = BTreeSet::from([String::new()]);
        self.rebuild_rows();
    }

    fn collect_containers(value: &Value, pointer: String, out: &mut BTreeSet<String>) {
        if !is_container(value) {
            return;
        }
        for (token, child) in children(value) {
            Self::collect_containers(child, child_pointer(&pointer, &token), out);
        }
        out.insert(pointer);
    }

    fn top_level_keys(&self) -> Vec<String> {
        self.root
            .as_ref()
            .map(|root| children(root).into_iter().map(|(token, _)| token).collect())
            .unwrap_or_default()
    }
}

impl Viewer for JsonViewer {
    fn viewer_name(&self) -> &str {
        JSON_VIEWER_NAME
    }

    fn supported_media_types(&self) -> Vec<String> {
        vec![
            "application/json".to_string(),
            "text/json".to_string(),
            "application/geo+json".to_string(),
        ]
    }

    fn init(&mut self, file: DocumentFile, host: &mut HostContext<'_>) {
        self.base.bind(file);
        let toolbar = host.toolbar();
        toolbar.set_title(JSON_VIEWER_NAME);
        toolbar.add_action(ACTION_EXPAND_ALL, "Expand All", 'e');
        toolbar.add_action(ACTION_COLLAPSE_ALL, "Collapse All", 'x');

        self.base.begin_load(host, |file, token| {
            let bytes = read_to_end_cancellable(file, token, Some(MAX_JSON_BYTES))?;
            serde_json::from_slice::<Value>(&bytes)
                .map_err(|e| LoadError::parse(format!("invalid JSON: {e}")))
        });
    }

    fn poll_load(&mut self, host: &mut HostContext<'_>) -> LoadProgress {
        let name = self.base.file_name();
        let root = &mut self.root;
        let progress = self.base.poll_load(host, |value, host| {
            host.status_message(
                format!("Opened \"{name}\", {}", summarize(&value)),
                JSON_VIEWER_NAME,
            );
            *root = Some(value);
            Ok(())
        });
        if progress == LoadProgress::Loaded && self.rows.is_empty() {
            self.rebuild_rows();
        }
        #[cfg(feature = "print")]
        self.base.maybe_enable_printing(self.root.is_some());
        progress
    }

    fn has_content(&self) -> bool {
        self.root.is_some()
    }

    fn save_state(&self) -> Vec<u8> {
        encode_state(
            STATE_VERSION,
            &JsonState {
                expanded: self.expanded.iter().cloned().collect(),
                selected: self.selected_pointer().unwrap_or_default().to_string(),
            },
        )
    }

    fn restore_state(&mut self, blob: &[u8]) -> bool {
        let Some(state) = decode_state::<JsonState>(blob, STATE_VERSION) else {
            return false;
        };
        let Some(root) = &self.root else {
            return false;
        };
        self.expanded = state
            .expanded
            .into_iter()
            .filter(|pointer| root.pointer(pointer).is_some())
            .collect();
        self.rebuild_rows();
        self.select_pointer(&state.selected);
        true
    }

    fn supports_overview(&self) -> bool {
        true
    }

    fn overview(&self) -> Vec<OverviewEntry> {
        self.top_level_keys()
            .into_iter()
            .map(|key| OverviewEntry::new(key, 0))
            .collect()
    }

    fn jump_to_overview(&mut self, index: usize) -> bool {
        let Some(key) = self.top_level_keys().into_iter().nth(index) else {
            return false;
        };
        self.expanded.insert(String::new());
        self.rebuild_rows();
        self.select_pointer(&child_pointer("", &key));
        true
    }

    fn handle_key(&mut self, key: KeyEvent, _host: &mut HostContext<'_>) -> bool {
        if self.rows.is_empty() {
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
            KeyCode::Char('G') | KeyCode::End => self.select(self.rows.len() - 1),
            KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('l') | KeyCode::Right => {
                self.toggle_selected()
            }
            KeyCode::Char('h') | KeyCode::Left => self.collapse_or_parent(),
            _ => return false,
        }
        true
    }

    fn trigger_action(&mut self, id: &str, _host: &mut HostContext<'_>) -> bool {
        if self.root.is_none() {
            return false;
        }
        match id {
            ACTION_EXPAND_ALL => self.expand_all(),
            ACTION_COLLAPSE_ALL => self.collapse_all(),
            _ => return false,
        }
        true
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, palette: &Base16Palette) {
        if self.root.is_none() {
            return render_empty(&self.base, frame, area, palette);
        }

        let title = self.base.file_name();
        let block = document_block(&title, palette);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        self.scroll.set_viewport(inner.height as usize);
        self.scroll.reveal(self.selected);

        let (selection_bg, selection_fg) = palette.get_selection_colors(true);
        let lines: Vec<Line> = self
            .rows
            .iter()
            .enumerate()
            .skip(self.scroll.offset())
            .take(inner.height as usize)
            .map(|(index, row)| {
                let marker = if !row.expandable {
                    "  "
                } else if self.expanded.contains(&row.pointer) {
                    "▾ "
                } else {
                    "▸ "
                };
                let line = Line::from(vec![
                    Span::raw("  ".repeat(row.depth)),
                    Span::styled(marker, Style::default().fg(palette.base_03)),
                    Span::styled(row.label.clone(), Style::default().fg(palette.base_0d)),
                    Span::styled(": ", Style::default().fg(palette.base_03)),
                    Span::styled(row.summary.clone(), Style::default().fg(palette.base_0b)),
                ]);
                if index == self.selected {
                    line.style(
                        Style::default()
                            .bg(selection_bg)
                            .fg(selection_fg)
                            .add_modifier(Modifier::BOLD),
                    )
                } else {
                    line
                }
            })
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
        let root = self
            .root
            .as_ref()
            .ok_or(crate::viewer::PrintError::NoContent)?;
        let pretty = serde_json::to_string_pretty(root)
            .map_err(|e| crate::viewer::PrintError::Io(std::io::Error::other(e)))?;
        for line in pretty.lines() {
            printer.print_line(line);
        }
        Ok(())
    }
}
