use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use docview::cursor::CursorState;
use docview::notification::NotificationManager;
use docview::test_utils::test_helpers::{capture_terminal_state, create_test_terminal};
use docview::theme::ThemeId;
use docview::viewer::state::{decode_state, encode_state, state_version};
use docview::viewer::toolbar::ToolBar;
use docview::viewer::{DocumentFile, HostContext, LoadProgress, Viewer};
#[cfg(feature = "pdf")]
use docview::test_utils::test_helpers::text_pdf;
#[cfg(feature = "pdf")]
use docview::viewers::PdfViewer;
use docview::viewers::{CsvViewer, ImageViewer, JsonViewer, TextViewer};
use tempfile::TempDir;

/// Host-side pieces a viewer needs, owned by the test.
#[derive(Default)]
struct Harness {
    notifications: NotificationManager,
    toolbar: ToolBar,
    cursor: CursorState,
}

impl Harness {
    fn host(&mut self) -> HostContext<'_> {
        HostContext::new(&mut self.notifications, &mut self.toolbar, &mut self.cursor)
    }

    fn load(&mut self, viewer: &mut dyn Viewer, path: &Path) -> LoadProgress {
        viewer.init(DocumentFile::new(path), &mut self.host());
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let progress = viewer.poll_load(&mut self.host());
            if progress != LoadProgress::Pending {
                return progress;
            }
            assert!(Instant::now() < deadline, "load never finished");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn key(&mut self, viewer: &mut dyn Viewer, code: KeyCode) -> bool {
        viewer.handle_key(KeyEvent::new(code, KeyModifiers::NONE), &mut self.host())
    }
}

fn write(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn retagged(blob: &[u8], version: u32) -> Vec<u8> {
    let mut other = version.to_be_bytes().to_vec();
    other.extend_from_slice(&blob[4..]);
    other
}

#[test]
fn text_scroll_position_survives_a_new_viewer() {
    let dir = TempDir::new().unwrap();
    let body: String = (1..=40).map(|n| format!("line {n}\n")).collect();
    let path = write(&dir, "notes.txt", body.as_bytes());
    let mut harness = Harness::default();

    let mut first = TextViewer::new();
    assert_eq!(harness.load(&mut first, &path), LoadProgress::Loaded);
    assert_eq!(first.line_count(), 40);
    for _ in 0..5 {
        harness.key(&mut first, KeyCode::Char('j'));
    }
    first.trigger_action("wrap", &mut harness.host());
    let blob = first.save_state();
    assert_eq!(state_version(&blob), Some(1));

    let mut second = TextViewer::new();
    harness.load(&mut second, &path);
    assert!(second.restore_state(&blob));
    assert_eq!(second.scroll_offset(), 5);
    assert_eq!(second.save_state(), blob);

    let mut third = TextViewer::new();
    harness.load(&mut third, &path);
    assert!(!third.restore_state(&retagged(&blob, 2)));
    assert_eq!(third.scroll_offset(), 0);
}

#[test]
fn json_expansion_and_selection_are_restored() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "data.json", br#"{"a": {"b": 1}, "c": [1, 2]}"#);
    let mut harness = Harness::default();

    let mut first = JsonViewer::new();
    assert_eq!(harness.load(&mut first, &path), LoadProgress::Loaded);
    assert_eq!(first.visible_rows(), 3);
    harness.key(&mut first, KeyCode::Char('j'));
    harness.key(&mut first, KeyCode::Enter);
    harness.key(&mut first, KeyCode::Char('j'));
    assert_eq!(first.visible_rows(), 4);
    assert_eq!(first.selected_pointer(), Some("/a/b"));
    let blob = first.save_state();

    let mut second = JsonViewer::new();
    harness.load(&mut second, &path);
    assert!(second.restore_state(&blob));
    assert_eq!(second.visible_rows(), 4);
    assert_eq!(second.selected_pointer(), Some("/a/b"));

    let mut third = JsonViewer::new();
    harness.load(&mut third, &path);
    assert!(!third.restore_state(&retagged(&blob, 7)));
    assert_eq!(third.visible_rows(), 3);
}

#[test]
fn json_state_for_a_changed_document_falls_back_to_an_ancestor() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "data.json", br#"{"a": {"b": 1}}"#);
    let mut harness = Harness::default();

    let mut first = JsonViewer::new();
    harness.load(&mut first, &path);
    harness.key(&mut first, KeyCode::Char('j'));
    harness.key(&mut first, KeyCode::Enter);
    harness.key(&mut first, KeyCode::Char('j'));
    let blob = first.save_state();

    std::fs::write(&path, br#"{"a": 5}"#).unwrap();
    let mut second = JsonViewer::new();
    harness.load(&mut second, &path);
    assert!(second.restore_state(&blob));
    assert_eq!(second.selected_pointer(), Some("/a"));
}

#[test]
fn csv_selection_and_column_offset_are_restored() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "people.csv", b"name,age,city\nann,3,oslo\nbob,4,rome\ncid,5,lima\n");
    let mut harness = Harness::default();

    let mut first = CsvViewer::new();
    assert_eq!(harness.load(&mut first, &path), LoadProgress::Loaded);
    harness.key(&mut first, KeyCode::Char('j'));
    harness.key(&mut first, KeyCode::Char('j'));
    harness.key(&mut first, KeyCode::Char('l'));
    assert_eq!(first.selected_row(), 2);
    assert_eq!(first.first_column(), 1);
    let blob = first.save_state();

    let mut second = CsvViewer::new();
    harness.load(&mut second, &path);
    assert!(second.restore_state(&blob));
    assert_eq!(second.selected_row(), 2);
    assert_eq!(second.first_column(), 1);

    let mut third = CsvViewer::new();
    harness.load(&mut third, &path);
    assert!(!third.restore_state(&retagged(&blob, 0)));
    assert!(!third.restore_state(b"xy"));
    assert_eq!(third.selected_row(), 0);
}

#[test]
fn image_zoom_and_pan_are_restored() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dot.png");
    image::RgbImage::from_pixel(6, 4, image::Rgb([200, 10, 10]))
        .save(&path)
        .unwrap();
    let mut harness = Harness::default();

    let mut first = ImageViewer::new();
    assert_eq!(harness.load(&mut first, &path), LoadProgress::Loaded);
    assert_eq!(first.image().map(|i| (i.width(), i.height())), Some((6, 4)));
    assert!(first.trigger_action("zoom-in", &mut harness.host()));
    assert!(first.zoom() > 1.0);
    assert!(harness.key(&mut first, KeyCode::Char('l')));
    let blob = first.save_state();

    let mut second = ImageViewer::new();
    harness.load(&mut second, &path);
    assert!(second.restore_state(&blob));
    assert_eq!(second.zoom(), first.zoom());
    assert_eq!(second.save_state(), blob);

    let mut third = ImageViewer::new();
    harness.load(&mut third, &path);
    assert!(!third.restore_state(&retagged(&blob, 3)));
    assert_eq!(third.zoom(), 1.0);
}

#[test]
fn a_viewer_ignores_another_viewers_state() {
    let dir = TempDir::new().unwrap();
    let text = write(&dir, "notes.txt", b"one\ntwo\nthree\n");
    let csv = write(&dir, "table.csv", b"a,b\n1,2\n");
    let mut harness = Harness::default();

    let mut csv_viewer = CsvViewer::new();
    harness.load(&mut csv_viewer, &csv);
    let csv_blob = csv_viewer.save_state();

    let mut text_viewer = TextViewer::new();
    harness.load(&mut text_viewer, &text);
    assert!(!text_viewer.restore_state(&csv_blob));
    assert_eq!(text_viewer.scroll_offset(), 0);
}

#[test]
fn image_state_with_runaway_pan_still_renders() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dot.png");
    image::RgbImage::from_pixel(6, 4, image::Rgb([200, 10, 10]))
        .save(&path)
        .unwrap();
    let mut harness = Harness::default();

    let mut viewer = ImageViewer::new();
    harness.load(&mut viewer, &path);
    let blob = encode_state(
        1,
        &serde_json::json!({ "zoom": 2.0, "pan_x": i64::MIN, "pan_y": i64::MAX }),
    );
    assert!(viewer.restore_state(&blob));
    assert_eq!(viewer.zoom(), 2.0);

    let mut terminal = create_test_terminal(40, 10);
    let palette = ThemeId::OceanicNext.palette();
    terminal
        .draw(|f| {
            let area = f.area();
            viewer.render(f, area, palette);
        })
        .unwrap();
    assert!(capture_terminal_state(&terminal).contains("dot.png"));

    // Panning from the bound does not wrap around.
    for _ in 0..3 {
        harness.key(&mut viewer, KeyCode::Char('j'));
        harness.key(&mut viewer, KeyCode::Char('h'));
    }
    let saved: serde_json::Value = decode_state(&viewer.save_state(), 1).unwrap();
    assert!(saved["pan_y"].as_i64().unwrap() > 0);
    assert!(saved["pan_x"].as_i64().unwrap() < 0);
    assert!(saved["pan_y"].as_i64().unwrap() < i64::MAX / 2);
}

#[test]
fn image_reset_is_only_offered_away_from_fit_zoom() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dot.png");
    image::RgbImage::from_pixel(6, 4, image::Rgb([200, 10, 10]))
        .save(&path)
        .unwrap();
    let mut harness = Harness::default();

    let mut viewer = ImageViewer::new();
    harness.load(&mut viewer, &path);
    assert!(!harness.toolbar.is_enabled("zoom-reset"));

    viewer.trigger_action("zoom-in", &mut harness.host());
    assert!(harness.toolbar.is_enabled("zoom-reset"));

    viewer.trigger_action("zoom-reset", &mut harness.host());
    assert_eq!(viewer.zoom(), 1.0);
    assert!(!harness.toolbar.is_enabled("zoom-reset"));
}

#[cfg(feature = "pdf")]
#[test]
fn pdf_pages_load_and_navigate() {
    let dir = TempDir::new().unwrap();
    let pdf = text_pdf(&["Alpha page", "Beta page", "Gamma page"]);
    let path = write(&dir, "report.pdf", &pdf);
    let mut harness = Harness::default();

    let mut viewer = PdfViewer::new();
    assert_eq!(harness.load(&mut viewer, &path), LoadProgress::Loaded);
    assert_eq!(viewer.page_count(), 3);
    assert_eq!(viewer.overview().len(), 3);
    assert!(viewer.page(0).unwrap().join(" ").contains("Alpha"));

    assert!(viewer.trigger_action("next-page", &mut harness.host()));
    assert_eq!(viewer.current_page(), 1);
    assert!(viewer.page(1).unwrap().join(" ").contains("Beta"));

    assert!(viewer.jump_to_overview(2));
    assert!(!viewer.trigger_action("next-page", &mut harness.host()));
    assert_eq!(viewer.current_page(), 2);
    assert!(viewer.trigger_action("prev-page", &mut harness.host()));
    assert_eq!(viewer.current_page(), 1);
    assert!(!viewer.jump_to_overview(3));
}

#[cfg(feature = "pdf")]
#[test]
fn pdf_page_is_restored() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "report.pdf", &text_pdf(&["one", "two"]));
    let mut harness = Harness::default();

    let mut first = PdfViewer::new();
    harness.load(&mut first, &path);
    assert!(first.jump_to_overview(1));
    let blob = first.save_state();

    let mut second = PdfViewer::new();
    harness.load(&mut second, &path);
    assert!(second.restore_state(&blob));
    assert_eq!(second.current_page(), 1);
    assert_eq!(second.save_state(), blob);

    let mut third = PdfViewer::new();
    harness.load(&mut third, &path);
    assert!(!third.restore_state(&retagged(&blob, 9)));
    let past_the_end = encode_state(1, &serde_json::json!({ "page": 5, "offset": 0 }));
    assert!(!third.restore_state(&past_the_end));
    assert_eq!(third.current_page(), 0);
}
