use std::path::{Path, PathBuf};
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use docview::App;
use docview::document_slot::SlotState;
use docview::plugin::PluginRegistry;
use docview::session::Session;
use docview::settings::Settings;
use docview::test_utils::probe::{ProbeGate, ProbeLog, probe_catalog, probe_registry};
use docview::test_utils::test_helpers::wait_until_settled;
use tempfile::TempDir;

fn settings_for(dir: &TempDir) -> Settings {
    Settings {
        print_directory: Some(dir.path().to_path_buf()),
        ..Settings::default()
    }
}

fn host(dir: &TempDir, settings: Settings, registry: PluginRegistry) -> App {
    let session = Session::with_file(&dir.path().join("session.json"));
    App::new_with_config(settings, session, registry)
}

fn probe_host(dir: &TempDir, log: &ProbeLog, gate: &ProbeGate) -> App {
    host(dir, settings_for(dir), probe_registry(log, gate))
}

fn write_doc(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn press(app: &mut App, c: char) {
    app.handle_key_event(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
}

fn current_name(app: &App) -> Option<String> {
    app.current_path()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().to_string())
}

fn recent_names(app: &App) -> Vec<String> {
    app.session()
        .recent
        .entries()
        .iter()
        .map(|entry| entry.title())
        .collect()
}

#[test]
fn opening_resolves_the_probe_by_extension() {
    let dir = TempDir::new().unwrap();
    let log = ProbeLog::new();
    let gate = ProbeGate::opened();
    let mut app = probe_host(&dir, &log, &gate);
    let doc = write_doc(&dir, "a.probe", "one\ntwo\n");

    assert!(app.open_file(&doc));
    assert_eq!(app.current_media_type(), Some("application/x-docview-probe"));
    assert_eq!(wait_until_settled(&mut app), SlotState::Ready);

    assert_eq!(
        log.events(),
        ["create", "init a.probe", "worker done a.probe", "loaded a.probe"]
    );
    assert_eq!(app.toolbar().title(), Some("Probe Viewer"));
    assert_eq!(recent_names(&app), ["a.probe"]);
}

#[test]
fn replacing_a_document_drops_the_old_viewer_first() {
    let dir = TempDir::new().unwrap();
    let log = ProbeLog::new();
    let gate = ProbeGate::opened();
    let mut app = probe_host(&dir, &log, &gate);
    let a = write_doc(&dir, "a.probe", "one\n");
    let b = write_doc(&dir, "b.probe", "two\n");

    app.open_file(&a);
    wait_until_settled(&mut app);
    app.open_file(&b);

    let dropped = log.position("drop a.probe").expect("old viewer dropped");
    let initialised = log.position("init b.probe").expect("new viewer initialised");
    assert!(dropped < initialised, "events: {:?}", log.events());

    assert_eq!(wait_until_settled(&mut app), SlotState::Ready);
    assert_eq!(current_name(&app).as_deref(), Some("b.probe"));
    assert_eq!(recent_names(&app), ["b.probe", "a.probe"]);
}

#[test]
fn closing_during_a_load_cancels_it() {
    let dir = TempDir::new().unwrap();
    let log = ProbeLog::new();
    let gate = ProbeGate::closed();
    let mut app = probe_host(&dir, &log, &gate);
    let a = write_doc(&dir, "a.probe", "one\n");
    let b = write_doc(&dir, "b.probe", "two\n");

    app.open_file(&a);
    assert_eq!(app.slot_state(), SlotState::Loading);
    assert!(app.cursor().is_busy());

    assert!(app.close_current());
    assert_eq!(app.slot_state(), SlotState::Empty);
    assert!(log.contains("drop a.probe"));
    assert!(!app.cursor().is_busy());
    assert!(app.toolbar().is_empty());

    gate.open();
    app.open_file(&b);
    assert_eq!(wait_until_settled(&mut app), SlotState::Ready);
    std::thread::sleep(Duration::from_millis(20));
    app.tick();

    assert!(log.contains("loaded b.probe"));
    assert!(!log.contains("loaded a.probe"));
    assert_eq!(recent_names(&app), ["b.probe"]);
}

#[test]
fn opens_during_a_load_are_queued_and_the_latest_wins() {
    let dir = TempDir::new().unwrap();
    let log = ProbeLog::new();
    let gate = ProbeGate::closed();
    let mut app = probe_host(&dir, &log, &gate);
    let a = write_doc(&dir, "a.probe", "one\n");
    let b = write_doc(&dir, "b.probe", "two\n");
    let c = write_doc(&dir, "c.probe", "three\n");

    app.open_file(&a);
    assert!(app.open_file(&b));
    assert!(app.open_file(&c));
    assert_eq!(current_name(&app).as_deref(), Some("a.probe"));
    assert!(app.pending_open().is_some_and(|p| p.ends_with("c.probe")));

    gate.open();
    assert_eq!(wait_until_settled(&mut app), SlotState::Ready);

    assert_eq!(current_name(&app).as_deref(), Some("c.probe"));
    assert!(!log.contains("init b.probe"));
    assert_eq!(recent_names(&app), ["c.probe", "a.probe"]);
}

#[test]
fn a_failed_load_is_not_remembered() {
    let dir = TempDir::new().unwrap();
    let log = ProbeLog::new();
    let gate = ProbeGate::opened();
    let mut app = probe_host(&dir, &log, &gate);
    let bad = write_doc(&dir, "bad.probe", "FAIL please\n");

    assert!(app.open_file(&bad));
    assert_eq!(wait_until_settled(&mut app), SlotState::Failed);

    assert!(!log.contains("loaded bad.probe"));
    assert!(app.session().recent.is_empty());
    assert!(app.viewer().is_some_and(|viewer| !viewer.has_content()));
    assert!(app.overview().is_empty());
}

#[test]
fn unsupported_format_leaves_the_current_document_open() {
    let dir = TempDir::new().unwrap();
    let log = ProbeLog::new();
    let gate = ProbeGate::opened();
    let mut app = probe_host(&dir, &log, &gate);
    let a = write_doc(&dir, "a.probe", "one\n");
    let blob = dir.path().join("blob.weird");
    std::fs::write(&blob, [0x7f, 0x00, 0xfe, 0x13, 0x00, 0x42, 0x99]).unwrap();

    app.open_file(&a);
    wait_until_settled(&mut app);

    assert!(!app.open_file(&blob));
    assert_eq!(app.slot_state(), SlotState::Ready);
    assert_eq!(current_name(&app).as_deref(), Some("a.probe"));
    assert!(!log.contains("drop a.probe"));

    let status = app.notifications.current().expect("error reported");
    assert!(
        status.message.starts_with("Cannot open this format"),
        "{}",
        status.message
    );
}

#[test]
fn failing_factory_leaves_the_current_document_open() {
    let dir = TempDir::new().unwrap();
    let log = ProbeLog::new();
    let gate = ProbeGate::opened();
    let mut catalog = probe_catalog(&log, &gate);
    catalog.register_with_manifest(
        "probe",
        docview::test_utils::probe::PROBE_MANIFEST,
        || Err("probe library missing".to_string()),
    );
    let mut registry = PluginRegistry::new(catalog);
    registry.discover(&[]);
    let mut app = host(&dir, settings_for(&dir), registry);

    let notes = write_doc(&dir, "notes.txt", "plain words\n");
    let doc = write_doc(&dir, "a.probe", "one\n");

    app.open_file(&notes);
    assert_eq!(wait_until_settled(&mut app), SlotState::Ready);

    assert!(!app.open_file(&doc));
    assert_eq!(current_name(&app).as_deref(), Some("notes.txt"));
    assert_eq!(app.slot_state(), SlotState::Ready);
    let status = app.notifications.current().expect("error reported");
    assert!(status.message.contains("probe library missing"), "{}", status.message);
}

#[test]
fn recent_files_stay_within_the_configured_bound() {
    let dir = TempDir::new().unwrap();
    let log = ProbeLog::new();
    let gate = ProbeGate::opened();
    let settings = Settings {
        max_recent_files: 2,
        ..settings_for(&dir)
    };
    let mut app = host(&dir, settings, probe_registry(&log, &gate));

    for name in ["a.probe", "b.probe", "c.probe"] {
        let doc = write_doc(&dir, name, "line\n");
        app.open_file(&doc);
        wait_until_settled(&mut app);
    }

    assert_eq!(recent_names(&app), ["c.probe", "b.probe"]);
}

#[test]
fn reopening_a_document_restores_its_state() {
    let dir = TempDir::new().unwrap();
    let log = ProbeLog::new();
    let gate = ProbeGate::opened();
    let mut app = probe_host(&dir, &log, &gate);
    let a = write_doc(&dir, "a.probe", "one\ntwo\nthree\n");
    let b = write_doc(&dir, "b.probe", "other\n");

    app.open_file(&a);
    wait_until_settled(&mut app);
    press(&mut app, 'j');
    press(&mut app, 'j');
    press(&mut app, 'm');
    assert!(log.contains("mark 1"));

    app.open_file(&b);
    wait_until_settled(&mut app);
    assert!(!log.contains("restored 2 1"));

    app.open_file(&a);
    wait_until_settled(&mut app);
    assert!(log.contains("restored 2 1"), "events: {:?}", log.events());
}

#[test]
fn restoring_can_be_switched_off() {
    let dir = TempDir::new().unwrap();
    let log = ProbeLog::new();
    let gate = ProbeGate::opened();
    let settings = Settings {
        restore_document_state: false,
        ..settings_for(&dir)
    };
    let mut app = host(&dir, settings, probe_registry(&log, &gate));
    let a = write_doc(&dir, "a.probe", "one\ntwo\n");
    let b = write_doc(&dir, "b.probe", "other\n");

    app.open_file(&a);
    wait_until_settled(&mut app);
    press(&mut app, 'j');
    app.open_file(&b);
    wait_until_settled(&mut app);
    app.open_file(&a);
    wait_until_settled(&mut app);

    assert!(log.events().iter().all(|e| !e.starts_with("restored")));
}

#[test]
fn overview_jump_reaches_the_viewer() {
    let dir = TempDir::new().unwrap();
    let log = ProbeLog::new();
    let gate = ProbeGate::opened();
    let mut app = probe_host(&dir, &log, &gate);
    let a = write_doc(&dir, "a.probe", "intro\nbody\nend\n");

    app.open_file(&a);
    wait_until_settled(&mut app);
    assert_eq!(app.overview().entries().len(), 3);

    app.handle_key_event(KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE));
    assert_eq!(
        app.focused_panel,
        docview::FocusedPanel::Main(docview::MainPanel::Overview)
    );
    press(&mut app, 'j');
    app.handle_key_event(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));

    assert!(log.contains("jump 1"));
    assert_eq!(
        app.focused_panel,
        docview::FocusedPanel::Main(docview::MainPanel::Content)
    );
}

#[cfg(feature = "print")]
#[test]
fn printing_writes_the_document_to_the_print_directory() {
    use docview::viewer::PrintStatus;

    let dir = TempDir::new().unwrap();
    let log = ProbeLog::new();
    let gate = ProbeGate::opened();
    let mut app = probe_host(&dir, &log, &gate);

    assert_eq!(app.print_current(), None);

    let a = write_doc(&dir, "report.probe", "alpha\nbeta\n");
    app.open_file(&a);
    wait_until_settled(&mut app);

    assert_eq!(app.print_current(), Some(PrintStatus::Success));
    let printed = std::fs::read_to_string(dir.path().join("report.txt")).unwrap();
    assert!(printed.contains("alpha"));
    assert!(printed.contains("beta"));
}

#[test]
fn shutdown_releases_the_viewer_and_saves_the_session() {
    let dir = TempDir::new().unwrap();
    let log = ProbeLog::new();
    let gate = ProbeGate::opened();
    let mut app = probe_host(&dir, &log, &gate);
    let a = write_doc(&dir, "a.probe", "one\ntwo\n");

    app.open_file(&a);
    wait_until_settled(&mut app);
    press(&mut app, 'j');
    let opened = app.current_path().unwrap().to_path_buf();

    app.shutdown();
    app.shutdown();
    assert_eq!(app.slot_state(), SlotState::Empty);
    assert_eq!(
        log.events().iter().filter(|e| *e == "drop a.probe").count(),
        1
    );

    let saved = Session::load_from_file(&dir.path().join("session.json")).unwrap();
    assert_eq!(saved.recent.len(), 1);
    assert!(saved.recent.state_for(&opened).is_some());
    assert_eq!(saved.last_directory.as_deref(), opened.parent());
}
