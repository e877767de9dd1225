use std::path::{Path, PathBuf};

use docview::plugin::{
    DEBUG_PLUGINS_ENV, DescriptorSource, DiscoveryDefect, PluginError, PluginRegistry,
    ViewerCatalog, verbose_diagnostics,
};
use docview::viewers::TextViewer;
use serial_test::serial;
use tempfile::TempDir;

fn manifest(entry: &str, name: &str, mime_types: &[&str]) -> String {
    serde_json::json!({
        "iid": "io.docview.ViewerInterface",
        "api_version": "1.2",
        "entry": entry,
        "name": name,
        "version": "2.0.0",
        "mime_types": mime_types,
        "file_extensions": ["note"],
        "features": ["view"],
        "homepage": "ignored"
    })
    .to_string()
}

fn write(dir: &Path, file: &str, contents: &str) -> PathBuf {
    let path = dir.join(file);
    std::fs::write(&path, contents).unwrap();
    path
}

fn builtin_count() -> usize {
    PluginRegistry::with_builtin_viewers().descriptors().len()
}

#[test]
fn builtin_viewers_resolve_their_types() {
    let registry = PluginRegistry::with_builtin_viewers();
    assert!(registry.warnings().is_empty());

    assert_eq!(registry.resolve("application/json").unwrap().name(), "JSON Viewer");
    assert_eq!(registry.resolve("text/csv").unwrap().name(), "CSV Viewer");
    assert_eq!(registry.resolve("image/png").unwrap().name(), "Image Viewer");
    assert_eq!(registry.resolve("text/plain").unwrap().name(), "Text Viewer");
    #[cfg(feature = "pdf")]
    assert_eq!(registry.resolve("application/pdf").unwrap().name(), "PDF Viewer");
}

#[test]
fn resolve_is_case_insensitive_and_stable() {
    let registry = PluginRegistry::with_builtin_viewers();
    let first = registry.resolve("TEXT/PLAIN").unwrap().name().to_string();
    for _ in 0..3 {
        assert_eq!(registry.resolve("text/plain").unwrap().name(), first);
    }
    assert_eq!(registry.descriptors().len(), builtin_count());
}

#[test]
fn unknown_type_has_no_viewer() {
    let registry = PluginRegistry::with_builtin_viewers();
    match registry.resolve("model/gltf+json") {
        Err(PluginError::NoViewer { media_type }) => assert_eq!(media_type, "model/gltf+json"),
        other => panic!("expected NoViewer, got {other:?}"),
    }
}

#[test]
fn external_manifests_follow_builtins_in_file_name_order() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "b-notes.json", &manifest("text", "Notes Viewer", &["text/x-notes"]));
    write(
        dir.path(),
        "a-logs.json",
        &manifest("text", "Log Viewer", &["text/x-notes", "text/x-logs"]),
    );
    write(dir.path(), "readme.txt", "not a manifest");

    let mut registry = PluginRegistry::new(ViewerCatalog::builtin());
    let count = registry.discover(&[dir.path().to_path_buf()]);
    assert_eq!(count, builtin_count() + 2);

    let names: Vec<_> = registry.descriptors()[builtin_count()..]
        .iter()
        .map(|d| d.name().to_string())
        .collect();
    assert_eq!(names, ["Log Viewer", "Notes Viewer"]);

    // First registered wins for a shared type.
    assert_eq!(registry.resolve("text/x-notes").unwrap().name(), "Log Viewer");
    assert!(matches!(
        registry.resolve("text/x-notes").unwrap().source(),
        DescriptorSource::Manifest(path) if path.ends_with("a-logs.json")
    ));
    assert_eq!(registry.media_type_for_extension(".NOTE"), Some("text/x-notes"));
}

#[test]
fn one_bad_manifest_among_valid_ones_is_skipped() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "1.json", &manifest("text", "Viewer One", &["text/x-one"]));
    write(dir.path(), "2.json", "{ \"iid\": ");
    write(dir.path(), "3.json", &manifest("csv", "Viewer Three", &["text/x-three"]));

    let mut registry = PluginRegistry::new(ViewerCatalog::builtin());
    registry.discover(&[dir.path().to_path_buf()]);

    assert_eq!(registry.descriptors().len(), builtin_count() + 2);
    assert_eq!(registry.warnings().len(), 1);
    assert!(matches!(registry.warnings()[0].defect, DiscoveryDefect::Malformed(_)));
}

#[test]
fn each_defect_is_reported() {
    let dir = TempDir::new().unwrap();
    let mut wrong_iid: serde_json::Value =
        serde_json::from_str(&manifest("text", "Wrong Iid", &["text/x-a"])).unwrap();
    wrong_iid["iid"] = "org.example.Other".into();
    write(dir.path(), "a.json", &wrong_iid.to_string());

    let mut wrong_api: serde_json::Value =
        serde_json::from_str(&manifest("text", "Wrong Api", &["text/x-b"])).unwrap();
    wrong_api["api_version"] = "2.0".into();
    write(dir.path(), "b.json", &wrong_api.to_string());

    write(dir.path(), "c.json", &manifest("scene3d", "Scene", &["model/gltf+json"]));
    write(dir.path(), "d.json", &manifest("text", "Empty", &[]));
    write(dir.path(), "e.json", &manifest("text", "Text Viewer", &["text/x-e"]));

    let mut registry = PluginRegistry::new(ViewerCatalog::builtin());
    registry.discover(&[dir.path().to_path_buf()]);

    let defects: Vec<_> = registry.warnings().iter().map(|w| w.defect.clone()).collect();
    assert_eq!(
        defects,
        vec![
            DiscoveryDefect::WrongInterface {
                found: "org.example.Other".to_string()
            },
            DiscoveryDefect::IncompatibleApi {
                found: "2.0".to_string()
            },
            DiscoveryDefect::UnknownEntry {
                entry: "scene3d".to_string()
            },
            DiscoveryDefect::NoMediaTypes,
            DiscoveryDefect::DuplicateName {
                name: "Text Viewer".to_string()
            },
        ]
    );
    assert_eq!(registry.descriptors().len(), builtin_count());
}

#[test]
fn missing_directories_are_ignored() {
    let mut registry = PluginRegistry::new(ViewerCatalog::builtin());
    let count = registry.discover(&[PathBuf::from("/definitely/not/here")]);
    assert_eq!(count, builtin_count());
    assert!(registry.warnings().is_empty());
}

#[cfg(all(feature = "image-bmp", feature = "image-ico"))]
#[test]
fn builtin_manifests_only_declare_what_their_viewers_support() {
    let registry = PluginRegistry::with_builtin_viewers();
    for descriptor in registry.descriptors() {
        let viewer = registry.instantiate(descriptor).unwrap();
        let supported = viewer.supported_media_types();
        for media_type in descriptor.media_types() {
            assert!(
                supported.contains(media_type),
                "{} declares {media_type} but supports {supported:?}",
                descriptor.name()
            );
        }
    }
}

#[test]
fn builtin_viewer_is_not_handed_a_type_it_cannot_decode() {
    // An image manifest bound to a viewer that only reads text.
    let mut catalog = ViewerCatalog::empty();
    catalog.register_with_manifest("image", include_str!("../plugins/image.json"), || {
        Ok(Box::new(TextViewer::new()) as Box<dyn docview::viewer::Viewer>)
    });
    let mut registry = PluginRegistry::new(catalog);
    registry.discover(&[]);

    assert_eq!(registry.resolve("image/bmp").unwrap().name(), "Image Viewer");
    match registry.viewer_for("image/bmp") {
        Err(PluginError::Unsupported { name, media_type }) => {
            assert_eq!(name, "Image Viewer");
            assert_eq!(media_type, "image/bmp");
        }
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("viewer accepted a type it cannot decode"),
    }
}

#[test]
fn external_manifests_may_alias_types_onto_a_viewer() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "notes.json", &manifest("text", "Notes Viewer", &["text/x-notes"]));
    let mut registry = PluginRegistry::new(ViewerCatalog::builtin());
    registry.discover(&[dir.path().to_path_buf()]);

    let viewer = registry.viewer_for("text/x-notes").unwrap();
    assert_eq!(viewer.viewer_name(), "Text Viewer");
    assert!(matches!(
        registry.viewer_for("model/gltf+json"),
        Err(PluginError::NoViewer { .. })
    ));
}

#[test]
fn factories_run_only_on_instantiate() {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    let calls = Arc::new(AtomicUsize::new(0));
    let mut catalog = ViewerCatalog::empty();
    let counter = calls.clone();
    catalog.register_with_manifest(
        "text",
        include_str!("../plugins/text.json"),
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(TextViewer::new()) as Box<dyn docview::viewer::Viewer>)
        },
    );
    let mut registry = PluginRegistry::new(catalog);
    registry.discover(&[]);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let descriptor = registry.resolve("text/plain").unwrap();
    let viewer = registry.instantiate(descriptor).unwrap();
    assert_eq!(viewer.viewer_name(), "Text Viewer");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn failing_factory_is_an_instantiation_error() {
    let mut catalog = ViewerCatalog::empty();
    catalog.register_with_manifest("text", include_str!("../plugins/text.json"), || {
        Err("library missing".to_string())
    });
    let mut registry = PluginRegistry::new(catalog);
    registry.discover(&[]);

    let descriptor = registry.resolve("text/plain").unwrap();
    match registry.instantiate(descriptor) {
        Err(PluginError::Instantiate { name, reason }) => {
            assert_eq!(name, "Text Viewer");
            assert_eq!(reason, "library missing");
        }
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("factory failure was swallowed"),
    }
    assert!(registry.warnings().is_empty());
}

#[test]
#[serial]
fn debug_env_switches_on_verbose_diagnostics() {
    // SAFETY: serialised with the other environment tests.
    unsafe { std::env::set_var(DEBUG_PLUGINS_ENV, "1") };
    assert!(verbose_diagnostics());
    assert!(PluginRegistry::new(ViewerCatalog::empty()).is_verbose());

    unsafe { std::env::set_var(DEBUG_PLUGINS_ENV, "off") };
    assert!(!verbose_diagnostics());

    unsafe { std::env::remove_var(DEBUG_PLUGINS_ENV) };
    assert!(!verbose_diagnostics());
}
