use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::{debug, error, info, warn};
use ratatui::{
    Frame, Terminal,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::cursor::CursorState;
use crate::document_slot::{DocumentSlot, SlotState};
use crate::event_source::EventSource;
use crate::media_type::{detect_from_header, detect_media_type};
use crate::notification::{NotificationLevel, NotificationManager};
use crate::plugin::{PluginRegistry, ViewerCatalog, default_plugin_dirs};
use crate::session::{SESSION_FILENAME, Session};
use crate::settings::{self, Settings};
use crate::theme::{Base16Palette, ThemeId};
use crate::viewer::toolbar::ToolBar;
use crate::viewer::{DocumentFile, HostContext, Viewer, render_placeholder};
use crate::widget::{
    FileBrowser, FileBrowserAction, OverviewPanel, RecentPopup, RecentPopupAction,
};

#[cfg(feature = "print")]
use crate::viewer::{PrintStatus, Printer};

const OPEN_CONTEXT: &str = "open";
const SESSION_CONTEXT: &str = "session";
const MIN_SIDEBAR_PERCENT: u16 = 15;
const MAX_SIDEBAR_PERCENT: u16 = 60;

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum AppAction {
    Quit,
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum FocusedPanel {
    Main(MainPanel),
    Popup(PopupWindow),
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum MainPanel {
    Overview,
    Content,
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum PopupWindow {
    FileBrowser,
    RecentFiles,
}

/// The host window: one document slot, its viewer, and everything around it.
pub struct App {
    registry: PluginRegistry,
    settings: Settings,
    session: Session,
    slot: DocumentSlot,
    pub notifications: NotificationManager,
    toolbar: ToolBar,
    cursor: CursorState,
    overview: OverviewPanel,
    pub focused_panel: FocusedPanel,
    file_browser: Option<FileBrowser>,
    recent_popup: Option<RecentPopup>,
    palette: &'static Base16Palette,
    shut_down: bool,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

impl App {
    /// Host with settings, session and plugins from their default locations.
    pub fn new() -> Self {
        let settings = Settings::load();
        let session_path = settings::config_dir().map(|dir| dir.join(SESSION_FILENAME));
        let session = Session::load_or_ephemeral(session_path.as_deref());

        let mut plugin_dirs = default_plugin_dirs();
        plugin_dirs.extend(settings.plugin_dirs.iter().cloned());
        let mut registry = PluginRegistry::new(ViewerCatalog::builtin());
        registry.discover(&plugin_dirs);

        Self::new_with_config(settings, session, registry)
    }

    pub fn new_with_config(
        settings: Settings,
        mut session: Session,
        registry: PluginRegistry,
    ) -> Self {
        session.recent.set_capacity(settings.max_recent_files);
        session.geometry.sidebar_percent = session
            .geometry
            .sidebar_percent
            .clamp(MIN_SIDEBAR_PERCENT, MAX_SIDEBAR_PERCENT);

        let mut notifications = NotificationManager::new();
        let skipped = registry.warnings().len();
        if skipped > 0 {
            notifications.warn(format!("{skipped} viewer plugin(s) skipped, see the log"));
        }
        info!(
            "Host ready with {} viewer(s), {} recent file(s)",
            registry.descriptors().len(),
            session.recent.len()
        );

        Self {
            palette: ThemeId::from_name(&settings.theme).palette(),
            registry,
            settings,
            session,
            slot: DocumentSlot::new(),
            notifications,
            toolbar: ToolBar::new(),
            cursor: CursorState::new(),
            overview: OverviewPanel::new(),
            focused_panel: FocusedPanel::Main(MainPanel::Content),
            file_browser: None,
            recent_popup: None,
            shut_down: false,
        }
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn slot_state(&self) -> SlotState {
        self.slot.state()
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.slot.path()
    }

    pub fn current_media_type(&self) -> Option<&str> {
        self.slot.document().map(|doc| doc.media_type.as_str())
    }

    pub fn pending_open(&self) -> Option<&Path> {
        self.slot.pending()
    }

    pub fn viewer(&self) -> Option<&dyn Viewer> {
        self.slot.viewer()
    }

    pub fn toolbar(&self) -> &ToolBar {
        &self.toolbar
    }

    pub fn cursor(&self) -> &CursorState {
        &self.cursor
    }

    pub fn overview(&self) -> &OverviewPanel {
        &self.overview
    }

    pub fn has_active_popup(&self) -> bool {
        matches!(self.focused_panel, FocusedPanel::Popup(_))
    }

    /// Run `f` against the active viewer with a host context.
    fn with_viewer<R>(
        &mut self,
        f: impl FnOnce(&mut dyn Viewer, &mut HostContext<'_>) -> R,
    ) -> Option<R> {
        let viewer = self.slot.viewer_mut()?;
        let mut host =
            HostContext::new(&mut self.notifications, &mut self.toolbar, &mut self.cursor);
        Some(f(viewer, &mut host))
    }

    /// Open `path` in a fresh viewer, replacing the current document.
    ///
    /// Returns false when no viewer could be created; the current document is
    /// then left as it was. While a load is in flight the request is queued
    /// and only the latest queued request survives.
    pub fn open_file(&mut self, path: &Path) -> bool {
        let path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let name = display_name(&path);

        if self.slot.is_loading() {
            if let Some(replaced) = self.slot.queue_open(&path) {
                debug!("Dropping queued open of {replaced:?}");
            }
            info!("Queued {path:?} until the current load settles");
            self.notifications.notify(
                format!("\"{name}\" will open when the current document finishes loading"),
                NotificationLevel::Info,
                Some(OPEN_CONTEXT),
            );
            return true;
        }

        let media_type = detect_media_type(&path, &self.registry).unwrap_or_else(|e| {
            debug!("Could not sniff {path:?}: {e}");
            detect_from_header(&path, &[], &self.registry)
        });

        let viewer = match self.registry.viewer_for(&media_type) {
            Ok(viewer) => viewer,
            Err(e) => {
                warn!("Cannot open {path:?} ({media_type}): {e}");
                self.notifications.notify(
                    format!("Cannot open this format: {e}"),
                    NotificationLevel::Error,
                    Some(OPEN_CONTEXT),
                );
                return false;
            }
        };

        self.teardown_current();

        if let Err(e) = self.slot.begin(viewer, &path, &media_type) {
            error!("Cannot open {path:?}: {e}");
            return false;
        }
        info!("Opening {path:?} as {media_type}");
        let file = DocumentFile::new(path.clone());
        self.with_viewer(move |viewer, host| viewer.init(file, host));

        if let Some(parent) = path.parent() {
            self.session.last_directory = Some(parent.to_path_buf());
        }
        self.focused_panel = FocusedPanel::Main(MainPanel::Content);
        true
    }

    /// Drive the in-flight load. Returns true when the slot settled.
    pub fn poll_document(&mut self) -> bool {
        if !self.slot.is_loading() {
            return false;
        }
        let Some(progress) = self.with_viewer(|viewer, host| viewer.poll_load(host)) else {
            return false;
        };
        let settled = match self.slot.settle(progress) {
            Ok(Some(state)) => state,
            Ok(None) => return false,
            Err(e) => {
                error!("{e}");
                return false;
            }
        };

        if settled == SlotState::Ready {
            self.finish_load();
        } else {
            self.overview.clear();
        }

        if let Some(next) = self.slot.take_pending() {
            self.open_file(&next);
        }
        true
    }

    fn finish_load(&mut self) {
        let Some(path) = self.slot.path().map(Path::to_path_buf) else {
            return;
        };
        let blob = self.session.recent.state_for(&path).map(<[u8]>::to_vec);
        self.session.recent.touch(&path);

        if self.settings.restore_document_state {
            if let Some(blob) = blob {
                let restored = self
                    .with_viewer(|viewer, _| viewer.restore_state(&blob))
                    .unwrap_or(false);
                if restored {
                    debug!("Restored viewer state for {path:?}");
                } else {
                    debug!("Saved state for {path:?} was not applied");
                }
            }
        }
        self.refresh_overview();
    }

    fn refresh_overview(&mut self) {
        match self.slot.viewer() {
            Some(viewer) if viewer.supports_overview() && viewer.has_content() => {
                self.overview.set_entries(viewer.overview())
            }
            _ => self.overview.clear(),
        }
    }

    /// Store the viewer's state in its recent entry. Only a ready document
    /// has state worth keeping.
    fn snapshot_state(&mut self) {
        if self.slot.state() != SlotState::Ready {
            return;
        }
        let (Some(path), Some(viewer)) = (self.slot.path(), self.slot.viewer()) else {
            return;
        };
        let blob = viewer.save_state();
        if !blob.is_empty() {
            let path = path.to_path_buf();
            self.session.recent.set_state(&path, blob);
        }
    }

    /// Release the active viewer: state saved, load cancelled, toolbar
    /// detached, file closed.
    fn teardown_current(&mut self) {
        let path = self.slot.path().map(Path::to_path_buf);
        self.snapshot_state();
        let released = match self.slot.state() {
            SlotState::Empty => return,
            SlotState::Loading => self.slot.cancel(),
            SlotState::Ready | SlotState::Failed => self.slot.release(),
        };
        match released {
            Ok(viewer) => drop(viewer),
            Err(e) => error!("{e}"),
        }

        self.toolbar.clear();
        self.cursor.reset();
        self.overview.clear();
        if self.focused_panel == FocusedPanel::Main(MainPanel::Overview) {
            self.focused_panel = FocusedPanel::Main(MainPanel::Content);
        }
        debug!("Released {path:?}");
    }

    pub fn close_current(&mut self) -> bool {
        if self.slot.is_empty() {
            return false;
        }
        let name = self.slot.path().map(display_name).unwrap_or_default();
        if let Some(dropped) = self.slot.take_pending() {
            debug!("Dropping queued open of {dropped:?}");
        }
        self.teardown_current();
        self.notifications.notify(
            format!("Closed \"{name}\""),
            NotificationLevel::Info,
            Some(OPEN_CONTEXT),
        );
        true
    }

    /// Write the session to disk, keeping the open document's state.
    pub fn save_session(&mut self) -> bool {
        self.snapshot_state();
        match self.session.save() {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to save session: {e}");
                self.notifications.notify(
                    format!("Failed to save session: {e}"),
                    NotificationLevel::Error,
                    Some(SESSION_CONTEXT),
                );
                false
            }
        }
    }

    /// Close the document and persist the session. Runs once.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.teardown_current();
        self.save_session();
        info!("Shut down");
    }

    #[cfg(feature = "print")]
    pub fn print_current(&mut self) -> Option<PrintStatus> {
        if self.slot.state() != SlotState::Ready {
            self.notifications
                .notify("Nothing to print", NotificationLevel::Warning, Some("print"));
            return None;
        }
        let stem = self
            .slot
            .path()
            .and_then(Path::file_stem)
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "document".to_string());
        let output = self.settings.print_directory().join(format!("{stem}.txt"));
        let printer = Printer::to_file(output);
        self.with_viewer(|viewer, host| viewer.print(printer, host))
    }

    pub fn handle_resize(&mut self, columns: u16, rows: u16) {
        self.session.geometry.columns = columns;
        self.session.geometry.rows = rows;
    }

    /// Periodic work: poll the load and expire status messages.
    pub fn tick(&mut self) -> bool {
        let settled = self.poll_document();
        let expired = self.notifications.update();
        settled || expired
    }

    fn overview_shown(&self) -> bool {
        self.session.geometry.overview_visible && !self.overview.is_empty()
    }

    fn toggle_overview(&mut self) {
        let geometry = &mut self.session.geometry;
        geometry.overview_visible = !geometry.overview_visible;
        if !geometry.overview_visible
            && self.focused_panel == FocusedPanel::Main(MainPanel::Overview)
        {
            self.focused_panel = FocusedPanel::Main(MainPanel::Content);
        }
    }

    fn resize_sidebar(&mut self, delta: i16) {
        let geometry = &mut self.session.geometry;
        geometry.sidebar_percent = geometry
            .sidebar_percent
            .saturating_add_signed(delta)
            .clamp(MIN_SIDEBAR_PERCENT, MAX_SIDEBAR_PERCENT);
    }

    fn toggle_focus(&mut self) {
        self.focused_panel = match self.focused_panel {
            FocusedPanel::Main(MainPanel::Content) if self.overview_shown() => {
                FocusedPanel::Main(MainPanel::Overview)
            }
            FocusedPanel::Main(_) => FocusedPanel::Main(MainPanel::Content),
            popup => popup,
        };
    }

    fn jump_to_overview(&mut self, index: usize) {
        let jumped = self
            .with_viewer(|viewer, _| viewer.jump_to_overview(index))
            .unwrap_or(false);
        if jumped {
            self.focused_panel = FocusedPanel::Main(MainPanel::Content);
        }
    }

    pub fn open_file_browser(&mut self) {
        let start = self
            .session
            .last_directory
            .clone()
            .filter(|dir| dir.is_dir())
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("/"));
        self.file_browser = Some(FileBrowser::new(&start));
        self.focused_panel = FocusedPanel::Popup(PopupWindow::FileBrowser);
    }

    pub fn open_recent_popup(&mut self) {
        self.recent_popup = Some(RecentPopup::new(&self.session.recent));
        self.focused_panel = FocusedPanel::Popup(PopupWindow::RecentFiles);
    }

    fn close_popup(&mut self) {
        self.file_browser = None;
        self.recent_popup = None;
        self.focused_panel = FocusedPanel::Main(MainPanel::Content);
    }

    fn handle_popup_key(&mut self, popup: PopupWindow, key: KeyEvent) {
        let open = match popup {
            PopupWindow::FileBrowser => match self
                .file_browser
                .as_mut()
                .and_then(|b| b.handle_key(key))
            {
                Some(FileBrowserAction::Close) => {
                    self.close_popup();
                    None
                }
                Some(FileBrowserAction::Open(path)) => Some(path),
                None => None,
            },
            PopupWindow::RecentFiles => match self
                .recent_popup
                .as_mut()
                .and_then(|p| p.handle_key(key))
            {
                Some(RecentPopupAction::Close) => {
                    self.close_popup();
                    None
                }
                Some(RecentPopupAction::Open(path)) => Some(path),
                None => None,
            },
        };
        if let Some(path) = open {
            self.close_popup();
            self.open_file(&path);
        }
    }

    fn handle_viewer_key(&mut self, key: KeyEvent) {
        if let KeyCode::Char(c) = key.code {
            if !key.modifiers.contains(KeyModifiers::CONTROL) {
                if let Some(id) = self.toolbar.action_for_key(c).map(|action| action.id) {
                    self.with_viewer(|viewer, host| viewer.trigger_action(id, host));
                    return;
                }
            }
        }
        self.with_viewer(|viewer, host| viewer.handle_key(key, host));
    }

    /// Route a key: popup first, then global keys, then the viewer's toolbar
    /// actions, then the focused panel.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> Option<AppAction> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        if let FocusedPanel::Popup(popup) = self.focused_panel {
            self.handle_popup_key(popup, key);
            return None;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => return Some(AppAction::Quit),
            KeyCode::Char('q') => return Some(AppAction::Quit),
            KeyCode::Char('s') if ctrl => {
                if self.save_session() {
                    self.notifications
                        .notify("Session saved", NotificationLevel::Info, Some(SESSION_CONTEXT));
                }
                return None;
            }
            #[cfg(feature = "print")]
            KeyCode::Char('p') if ctrl => {
                self.print_current();
                return None;
            }
            KeyCode::Esc => {
                if !self.notifications.dismiss_current() {
                    self.focused_panel = FocusedPanel::Main(MainPanel::Content);
                }
                return None;
            }
            KeyCode::Char('o') if !ctrl => {
                self.open_file_browser();
                return None;
            }
            KeyCode::Char('r') if !ctrl => {
                self.open_recent_popup();
                return None;
            }
            KeyCode::Char('c') => {
                self.close_current();
                return None;
            }
            KeyCode::Char('b') if !ctrl => {
                self.toggle_overview();
                return None;
            }
            KeyCode::Char('<') => {
                self.resize_sidebar(-5);
                return None;
            }
            KeyCode::Char('>') => {
                self.resize_sidebar(5);
                return None;
            }
            KeyCode::Tab => {
                self.toggle_focus();
                return None;
            }
            _ => {}
        }

        match self.focused_panel {
            FocusedPanel::Main(MainPanel::Overview) => {
                if let Some(index) = self.overview.handle_key(key) {
                    self.jump_to_overview(index);
                }
            }
            _ => self.handle_viewer_key(key),
        }
        None
    }

    pub fn draw(&mut self, f: &mut Frame) {
        let area = f.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(3),
            ])
            .split(area);

        self.render_menu_line(f, chunks[0]);
        self.render_body(f, chunks[1]);
        self.render_help_bar(f, chunks[2]);

        let palette = self.palette;
        match self.focused_panel {
            FocusedPanel::Popup(PopupWindow::FileBrowser) => {
                if let Some(browser) = self.file_browser.as_mut() {
                    browser.render(f, area, palette);
                }
            }
            FocusedPanel::Popup(PopupWindow::RecentFiles) => {
                if let Some(popup) = self.recent_popup.as_mut() {
                    popup.render(f, area, palette);
                }
            }
            FocusedPanel::Main(_) => {}
        }
    }

    fn render_body(&mut self, f: &mut Frame, area: Rect) {
        let palette = self.palette;
        let content_area = if self.overview_shown() {
            let percent = self.session.geometry.sidebar_percent;
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Percentage(percent),
                    Constraint::Percentage(100 - percent),
                ])
                .split(area);
            let focused = self.focused_panel == FocusedPanel::Main(MainPanel::Overview);
            self.overview.render(f, columns[0], focused, palette);
            columns[1]
        } else {
            area
        };

        match self.slot.viewer_mut() {
            Some(viewer) => viewer.render(f, content_area, palette),
            None => render_placeholder(
                f,
                content_area,
                "docview",
                "No document open. Press o to open a file or r for recent files.",
                palette,
            ),
        }
    }

    fn render_menu_line(&self, f: &mut Frame, area: Rect) {
        let palette = self.palette;
        let mut spans = Vec::new();
        if let Some(title) = self.toolbar.title() {
            spans.push(Span::styled(
                format!(" {title} "),
                Style::default()
                    .fg(palette.base_00)
                    .bg(palette.base_0d)
                    .add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::raw(" "));
        }
        for action in self.toolbar.actions() {
            let color = if action.enabled {
                palette.base_05
            } else {
                palette.base_03
            };
            spans.push(Span::styled(
                format!("{}: {}", action.key, action.label),
                Style::default().fg(color),
            ));
            spans.push(Span::styled(" | ", Style::default().fg(palette.base_03)));
        }
        spans.push(Span::styled(global_keys(), Style::default().fg(palette.base_04)));

        f.render_widget(
            Paragraph::new(Line::from(spans)).style(Style::default().bg(palette.base_01)),
            area,
        );
    }

    fn render_help_bar(&self, f: &mut Frame, area: Rect) {
        let palette = self.palette;
        let (_, border_color, bg_color) = palette.get_panel_colors(false);

        let (help_content, text_color) = if let Some(notification) = self.notifications.current() {
            let (level_str, color) = match notification.level {
                NotificationLevel::Info => ("INFO", palette.base_05),
                NotificationLevel::Warning => ("WARNING", palette.base_0a),
                NotificationLevel::Error => ("ERROR", palette.base_08),
            };
            (
                format!("[{level_str}] {} | ESC: Dismiss", notification.message),
                color,
            )
        } else {
            let help_text = match self.focused_panel {
                FocusedPanel::Main(MainPanel::Overview) => {
                    "j/k: Navigate | Enter: Jump | Tab: Content | b: Hide overview"
                }
                FocusedPanel::Main(MainPanel::Content) => {
                    concat!(
                        "j/k: Scroll | Ctrl+d/u: Half-screen | g/G: Top/Bottom | ",
                        "Tab: Overview | </>: Resize"
                    )
                }
                FocusedPanel::Popup(PopupWindow::FileBrowser) => {
                    "j/k: Navigate | Enter: Open | Backspace: Up | .: Hidden files | ESC: Close"
                }
                FocusedPanel::Popup(PopupWindow::RecentFiles) => {
                    "j/k: Navigate | Enter: Open | ESC: Close"
                }
            };
            (help_text.to_string(), palette.base_04)
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color))
            .style(Style::default().bg(bg_color));
        let inner_area = block.inner(area);
        f.render_widget(block, area);

        let indicator = if self.cursor.is_busy() {
            " Loading... ".to_string()
        } else if self.slot.is_empty() {
            String::new()
        } else {
            format!(" {} ", self.slot.state())
        };
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Min(0),
                Constraint::Length(indicator.chars().count() as u16),
            ])
            .split(inner_area);

        f.render_widget(
            Paragraph::new(help_content).style(Style::default().fg(text_color)),
            columns[0],
        );
        f.render_widget(
            Paragraph::new(indicator).style(
                Style::default()
                    .fg(palette.base_0a)
                    .add_modifier(Modifier::BOLD),
            ),
            columns[1],
        );
    }
}

fn global_keys() -> &'static str {
    if cfg!(feature = "print") {
        "o: Open | r: Recent | c: Close | b: Overview | Ctrl+p: Print | q: Quit"
    } else {
        "o: Open | r: Recent | c: Close | b: Overview | q: Quit"
    }
}

pub fn run_app_with_event_source<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    event_source: &mut dyn EventSource,
) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    let tick_rate = Duration::from_millis(50);
    let mut last_tick = Instant::now();
    let mut first_render = true;
    loop {
        let mut events_processed = 0;
        let mut should_quit = false;
        while event_source.poll(Duration::from_millis(0))? && events_processed < 50 {
            let event = event_source.read()?;
            events_processed += 1;
            match event {
                Event::Key(key) => {
                    if app.handle_key_event(key) == Some(AppAction::Quit) {
                        should_quit = true;
                    }
                }
                Event::Resize(columns, rows) => app.handle_resize(columns, rows),
                _ => {}
            }
            if should_quit {
                break;
            }
        }

        let mut needs_redraw = events_processed > 0 || first_render;
        first_render = false;

        if last_tick.elapsed() >= tick_rate {
            if app.tick() {
                needs_redraw = true;
            }
            last_tick = Instant::now();
        }

        if needs_redraw {
            terminal.draw(|f| app.draw(f))?;
        }

        if should_quit {
            app.shutdown();
            return Ok(());
        }

        // If no events were processed, wait a bit to avoid busy-waiting
        if events_processed == 0 {
            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_secs(0));
            let _ = event_source.poll(timeout);
        }
    }
}
