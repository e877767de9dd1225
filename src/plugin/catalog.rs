use std::sync::Arc;

use crate::viewer::Viewer;

/// Builds a fresh viewer instance. Runs on the UI thread at open time.
pub type ViewerFactory = Arc<dyn Fn() -> Result<Box<dyn Viewer>, String> + Send + Sync>;

struct CatalogEntry {
    entry: String,
    manifest: Option<&'static str>,
    factory: ViewerFactory,
}

/// Compiled-in viewer factories, keyed by manifest entry point.
///
/// Entries registered with a manifest are discovered as built-in plugins.
/// Entries without one are only reachable from external manifests.
#[derive(Default)]
pub struct ViewerCatalog {
    entries: Vec<CatalogEntry>,
}

impl ViewerCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Catalog holding every viewer compiled into this build
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        crate::viewers::register_builtin(&mut catalog);
        catalog
    }

    pub fn register<F>(&mut self, entry: &str, factory: F)
    where
        F: Fn() -> Result<Box<dyn Viewer>, String> + Send + Sync + 'static,
    {
        self.insert(entry, None, Arc::new(factory));
    }

    pub fn register_with_manifest<F>(&mut self, entry: &str, manifest: &'static str, factory: F)
    where
        F: Fn() -> Result<Box<dyn Viewer>, String> + Send + Sync + 'static,
    {
        self.insert(entry, Some(manifest), Arc::new(factory));
    }

    fn insert(&mut self, entry: &str, manifest: Option<&'static str>, factory: ViewerFactory) {
        let new_entry = CatalogEntry {
            entry: entry.to_string(),
            manifest,
            factory,
        };
        match self.entries.iter_mut().find(|e| e.entry == entry) {
            Some(existing) => *existing = new_entry,
            None => self.entries.push(new_entry),
        }
    }

    pub fn factory(&self, entry: &str) -> Option<ViewerFactory> {
        self.entries
            .iter()
            .find(|e| e.entry == entry)
            .map(|e| Arc::clone(&e.factory))
    }

    /// Bundled manifests in registration order
    pub fn builtin_manifests(&self) -> impl Iterator<Item = (&str, &'static str)> {
        self.entries
            .iter()
            .filter_map(|e| e.manifest.map(|m| (e.entry.as_str(), m)))
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.entry.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
