pub mod test_helpers {
    use crate::document_slot::SlotState;
    use crate::event_source::{Event, KeyCode, KeyModifiers, SimulatedEventSource};
    use crate::main_app::App;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::time::{Duration, Instant};

    /// Builder for creating test scenarios with simulated user input
    #[derive(Default)]
    pub struct TestScenarioBuilder {
        events: Vec<Event>,
    }

    impl TestScenarioBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn press_char(mut self, c: char) -> Self {
            self.events.push(SimulatedEventSource::char_key(c));
            self
        }

        pub fn press_ctrl_char(mut self, c: char) -> Self {
            self.events.push(SimulatedEventSource::ctrl_char_key(c));
            self
        }

        pub fn press_key(mut self, code: KeyCode) -> Self {
            self.events
                .push(SimulatedEventSource::key_event(code, KeyModifiers::empty()));
            self
        }

        pub fn press_enter(self) -> Self {
            self.press_key(KeyCode::Enter)
        }

        pub fn press_esc(self) -> Self {
            self.press_key(KeyCode::Esc)
        }

        pub fn press_tab(self) -> Self {
            self.press_key(KeyCode::Tab)
        }

        /// Press 'j' n times
        pub fn navigate_down(mut self, times: usize) -> Self {
            for _ in 0..times {
                self.events.push(SimulatedEventSource::char_key('j'));
            }
            self
        }

        /// Press 'k' n times
        pub fn navigate_up(mut self, times: usize) -> Self {
            for _ in 0..times {
                self.events.push(SimulatedEventSource::char_key('k'));
            }
            self
        }

        pub fn half_screen_down(self) -> Self {
            self.press_ctrl_char('d')
        }

        pub fn resize(mut self, columns: u16, rows: u16) -> Self {
            self.events.push(SimulatedEventSource::resize(columns, rows));
            self
        }

        pub fn quit(self) -> Self {
            self.press_char('q')
        }

        pub fn len(&self) -> usize {
            self.events.len()
        }

        pub fn is_empty(&self) -> bool {
            self.events.is_empty()
        }

        pub fn build(self) -> SimulatedEventSource {
            SimulatedEventSource::new(self.events)
        }
    }

    pub fn create_test_terminal(width: u16, height: u16) -> Terminal<TestBackend> {
        let backend = TestBackend::new(width, height);
        Terminal::new(backend).unwrap()
    }

    /// Capture the current terminal buffer as a string
    pub fn capture_terminal_state(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut lines = Vec::new();

        for y in 0..buffer.area.height {
            let mut line = String::new();
            for x in 0..buffer.area.width {
                line.push_str(buffer[(x, y)].symbol());
            }
            lines.push(line.trim_end().to_string());
        }

        while lines.last().map(|l| l.is_empty()).unwrap_or(false) {
            lines.pop();
        }

        lines.join("\n")
    }

    /// A minimal PDF with one line of Helvetica text per page.
    pub fn text_pdf(pages: &[&str]) -> Vec<u8> {
        let mut objects: Vec<String> = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            String::new(),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica \
             /Encoding /WinAnsiEncoding >>"
                .to_string(),
        ];
        let mut kids = Vec::new();
        for text in pages {
            let page_id = objects.len() + 1;
            let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
                 /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
                page_id + 1
            ));
            objects.push(format!(
                "<< /Length {} >>\nstream\n{content}\nendstream",
                content.len()
            ));
            kids.push(format!("{page_id} 0 R"));
        }
        objects[1] = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            pages.len()
        );

        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (index, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", index + 1).as_bytes());
        }
        let xref = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
        out.extend_from_slice(b"0000000000 65535 f \n");
        for offset in offsets {
            out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
                objects.len() + 1
            )
            .as_bytes(),
        );
        out
    }

    /// Tick the host until the document slot leaves `Loading`.
    pub fn wait_until_settled(app: &mut App) -> SlotState {
        let deadline = Instant::now() + Duration::from_secs(10);
        while app.slot_state() == SlotState::Loading || app.pending_open().is_some() {
            app.tick();
            assert!(Instant::now() < deadline, "document never settled");
            std::thread::sleep(Duration::from_millis(5));
        }
        app.slot_state()
    }
}

/// A viewer that records its lifecycle, for tests that need to see the
/// order in which the host creates, loads and drops viewers.
pub mod probe {
    use std::fs::File;
    use std::io::Read;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crossterm::event::{KeyCode, KeyEvent};
    use ratatui::Frame;
    use ratatui::layout::Rect;
    use ratatui::widgets::Paragraph;
    use serde::{Deserialize, Serialize};

    use crate::plugin::{PluginRegistry, ViewerCatalog};
    use crate::theme::Base16Palette;
    use crate::viewer::state::{decode_state, encode_state};
    use crate::viewer::{
        CancelToken, DocumentFile, HostContext, LoadError, LoadProgress, OverviewEntry, Viewer,
        ViewerBase,
    };

    pub const PROBE_NAME: &str = "Probe Viewer";
    pub const PROBE_MEDIA_TYPE: &str = "application/x-docview-probe";
    pub const PROBE_MANIFEST: &str = r#"{
        "iid": "io.docview.ViewerInterface",
        "api_version": "1.0",
        "entry": "probe",
        "name": "Probe Viewer",
        "description": "Records its lifecycle for tests",
        "version": "1.0.0",
        "mime_types": ["application/x-docview-probe"],
        "file_extensions": ["probe"],
        "features": ["overview", "print"]
    }"#;
    const STATE_VERSION: u32 = 1;

    /// Shared, ordered record of probe events
    #[derive(Clone, Default)]
    pub struct ProbeLog(Arc<Mutex<Vec<String>>>);

    impl ProbeLog {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&self, event: impl Into<String>) {
            self.0.lock().unwrap().push(event.into());
        }

        pub fn events(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }

        pub fn position(&self, event: &str) -> Option<usize> {
            self.events().iter().position(|e| e == event)
        }

        pub fn contains(&self, event: &str) -> bool {
            self.position(event).is_some()
        }
    }

    /// Holds probe loads until opened
    #[derive(Clone)]
    pub struct ProbeGate(Arc<AtomicBool>);

    impl ProbeGate {
        pub fn closed() -> Self {
            Self(Arc::new(AtomicBool::new(false)))
        }

        pub fn opened() -> Self {
            Self(Arc::new(AtomicBool::new(true)))
        }

        pub fn open(&self) {
            self.0.store(true, Ordering::SeqCst);
        }

        fn wait(&self, token: &CancelToken) -> Result<(), LoadError> {
            while !self.0.load(Ordering::SeqCst) {
                if token.is_cancelled() {
                    return Err(LoadError::Cancelled);
                }
                std::thread::sleep(Duration::from_millis(2));
            }
            Ok(())
        }
    }

    #[derive(Serialize, Deserialize)]
    struct ProbeState {
        position: usize,
        marks: u32,
    }

    pub struct ProbeViewer {
        base: ViewerBase<Vec<String>>,
        lines: Option<Vec<String>>,
        position: usize,
        marks: u32,
        log: ProbeLog,
        gate: ProbeGate,
    }

    impl ProbeViewer {
        pub fn new(log: ProbeLog, gate: ProbeGate) -> Self {
            log.push("create");
            Self {
                base: ViewerBase::new(PROBE_NAME),
                lines: None,
                position: 0,
                marks: 0,
                log,
                gate,
            }
        }

        fn read_lines(mut file: File) -> Result<Vec<String>, LoadError> {
            let mut text = String::new();
            file.read_to_string(&mut text)?;
            if text.starts_with("FAIL") {
                return Err(LoadError::parse("probe rejected the document"));
            }
            Ok(text.lines().map(str::to_string).collect())
        }
    }

    impl Drop for ProbeViewer {
        fn drop(&mut self) {
            self.log.push(format!("drop {}", self.base.file_name()));
        }
    }

    impl Viewer for ProbeViewer {
        fn viewer_name(&self) -> &str {
            PROBE_NAME
        }

        fn supported_media_types(&self) -> Vec<String> {
            vec![PROBE_MEDIA_TYPE.to_string()]
        }

        fn init(&mut self, file: DocumentFile, host: &mut HostContext<'_>) {
            self.log.push(format!("init {}", file.display_name()));
            self.base.bind(file);
            host.toolbar().set_title(PROBE_NAME);
            host.toolbar().add_action("mark", "Mark", 'm');

            let gate = self.gate.clone();
            let log = self.log.clone();
            let name = self.base.file_name();
            self.base.begin_load(host, move |file, token| {
                gate.wait(token)?;
                let lines = Self::read_lines(file);
                log.push(format!("worker done {name}"));
                lines
            });
        }

        fn poll_load(&mut self, host: &mut HostContext<'_>) -> LoadProgress {
            let name = self.base.file_name();
            let slot = &mut self.lines;
            let log = &self.log;
            let progress = self.base.poll_load(host, |lines, host| {
                log.push(format!("loaded {name}"));
                host.status_message(format!("Probe loaded {} lines", lines.len()), PROBE_NAME);
                *slot = Some(lines);
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
                &ProbeState {
                    position: self.position,
                    marks: self.marks,
                },
            )
        }

        fn restore_state(&mut self, blob: &[u8]) -> bool {
            let Some(state) = decode_state::<ProbeState>(blob, STATE_VERSION) else {
                return false;
            };
            self.position = state.position;
            self.marks = state.marks;
            self.log.push(format!("restored {} {}", state.position, state.marks));
            true
        }

        fn supports_overview(&self) -> bool {
            true
        }

        fn overview(&self) -> Vec<OverviewEntry> {
            self.lines
                .iter()
                .flatten()
                .map(|line| OverviewEntry::new(line.clone(), 0))
                .collect()
        }

        fn jump_to_overview(&mut self, index: usize) -> bool {
            if index >= self.lines.as_ref().map_or(0, Vec::len) {
                return false;
            }
            self.position = index;
            self.log.push(format!("jump {index}"));
            true
        }

        fn handle_key(&mut self, key: KeyEvent, _host: &mut HostContext<'_>) -> bool {
            match key.code {
                KeyCode::Char('j') if self.lines.is_some() => {
                    self.position += 1;
                    true
                }
                _ => false,
            }
        }

        fn trigger_action(&mut self, id: &str, _host: &mut HostContext<'_>) -> bool {
            if id != "mark" {
                return false;
            }
            self.marks += 1;
            self.log.push(format!("mark {}", self.marks));
            true
        }

        fn render(&mut self, frame: &mut Frame, area: Rect, _palette: &Base16Palette) {
            let text = format!(
                "{} position={} marks={}",
                self.base.file_name(),
                self.position,
                self.marks
            );
            frame.render_widget(Paragraph::new(text), area);
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
            for line in self.lines.iter().flatten() {
                printer.print_line(line);
            }
            Ok(())
        }
    }

    /// Built-in viewers plus the probe, registered last.
    pub fn probe_catalog(log: &ProbeLog, gate: &ProbeGate) -> ViewerCatalog {
        let mut catalog = ViewerCatalog::builtin();
        let log = log.clone();
        let gate = gate.clone();
        catalog.register_with_manifest("probe", PROBE_MANIFEST, move || {
            Ok(Box::new(ProbeViewer::new(log.clone(), gate.clone())) as Box<dyn Viewer>)
        });
        catalog
    }

    pub fn probe_registry(log: &ProbeLog, gate: &ProbeGate) -> PluginRegistry {
        let mut registry = PluginRegistry::new(probe_catalog(log, gate));
        registry.discover(&[]);
        registry
    }
}
