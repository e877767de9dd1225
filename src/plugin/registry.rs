use std::fmt;
use std::path::{Path, PathBuf};

use log::{Level, debug, log, warn};
use walkdir::WalkDir;

use crate::viewer::Viewer;

use super::catalog::{ViewerCatalog, ViewerFactory};
use super::error::{DescriptorSource, DiscoveryDefect, DiscoveryWarning, PluginError};
use super::metadata::{
    FEATURE_OVERVIEW, FEATURE_PRINT, PLUGIN_API_VERSION, PluginMetadata, VIEWER_INTERFACE_ID,
};

/// Set to a truthy value to log plugin discovery at info level
pub const DEBUG_PLUGINS_ENV: &str = "DOCVIEW_DEBUG_PLUGINS";

pub fn verbose_diagnostics() -> bool {
    std::env::var(DEBUG_PLUGINS_ENV)
        .map(|value| {
            matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(false)
}

/// Per-user manifest directory
pub fn default_plugin_dirs() -> Vec<PathBuf> {
    dirs::data_dir()
        .map(|dir| vec![dir.join("docview").join("plugins")])
        .unwrap_or_default()
}

/// A discovered plugin: its manifest plus the factory it binds to.
///
/// Immutable once discovered. The viewer behind it is not built until
/// [`PluginRegistry::instantiate`] is called.
pub struct ViewerDescriptor {
    metadata: PluginMetadata,
    source: DescriptorSource,
    factory: ViewerFactory,
}

impl ViewerDescriptor {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn description(&self) -> &str {
        &self.metadata.description
    }

    pub fn version(&self) -> &str {
        &self.metadata.version
    }

    pub fn author(&self) -> &str {
        &self.metadata.author
    }

    pub fn license(&self) -> &str {
        &self.metadata.license
    }

    pub fn media_types(&self) -> &[String] {
        &self.metadata.mime_types
    }

    pub fn file_extensions(&self) -> &[String] {
        &self.metadata.file_extensions
    }

    pub fn features(&self) -> &[String] {
        &self.metadata.features
    }

    pub fn supports_overview(&self) -> bool {
        self.metadata.has_feature(FEATURE_OVERVIEW)
    }

    pub fn supports_printing(&self) -> bool {
        self.metadata.has_feature(FEATURE_PRINT)
    }

    pub fn source(&self) -> &DescriptorSource {
        &self.source
    }

    pub fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    pub fn handles(&self, media_type: &str) -> bool {
        self.metadata
            .mime_types
            .iter()
            .any(|m| m.eq_ignore_ascii_case(media_type))
    }

    fn recognises_extension(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.');
        self.metadata
            .file_extensions
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

impl fmt::Debug for ViewerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewerDescriptor")
            .field("name", &self.metadata.name)
            .field("media_types", &self.metadata.mime_types)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

pub struct PluginRegistry {
    catalog: ViewerCatalog,
    descriptors: Vec<ViewerDescriptor>,
    warnings: Vec<DiscoveryWarning>,
    verbose: bool,
}

impl PluginRegistry {
    pub fn new(catalog: ViewerCatalog) -> Self {
        Self {
            catalog,
            descriptors: Vec::new(),
            warnings: Vec::new(),
            verbose: verbose_diagnostics(),
        }
    }

    /// Registry with the built-in viewers discovered and no external dirs
    pub fn with_builtin_viewers() -> Self {
        let mut registry = Self::new(ViewerCatalog::builtin());
        registry.discover(&[]);
        registry
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    fn diag_level(&self) -> Level {
        if self.verbose {
            Level::Info
        } else {
            Level::Debug
        }
    }

    /// Rebuild the descriptor list.
    ///
    /// Built-in manifests come first in catalog order, then each search
    /// directory in the order given, manifests within a directory sorted by
    /// file name. Returns the number of descriptors.
    pub fn discover(&mut self, search_dirs: &[PathBuf]) -> usize {
        self.descriptors.clear();
        self.warnings.clear();

        let builtin: Vec<(String, &'static str)> = self
            .catalog
            .builtin_manifests()
            .map(|(entry, manifest)| (entry.to_string(), manifest))
            .collect();
        for (entry, manifest) in builtin {
            self.register_manifest(DescriptorSource::Builtin(entry), manifest);
        }

        for dir in search_dirs {
            self.scan_dir(dir);
        }

        log!(
            self.diag_level(),
            "Plugin discovery finished: {} viewer(s), {} warning(s)",
            self.descriptors.len(),
            self.warnings.len()
        );
        self.descriptors.len()
    }

    fn scan_dir(&mut self, dir: &Path) {
        if !dir.is_dir() {
            log!(self.diag_level(), "Plugin directory {dir:?} does not exist, skipping");
            return;
        }
        log!(self.diag_level(), "Scanning {dir:?} for viewer manifests");

        let manifests: Vec<PathBuf> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Failed to read entry in {dir:?}: {e}");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
            })
            .collect();

        for path in manifests {
            let source = DescriptorSource::Manifest(path.clone());
            match std::fs::read_to_string(&path) {
                Ok(text) => self.register_manifest(source, &text),
                Err(e) => self.skip(source, DiscoveryDefect::Unreadable(e.to_string())),
            }
        }
    }

    fn register_manifest(&mut self, source: DescriptorSource, text: &str) {
        let metadata = match PluginMetadata::from_json(text) {
            Ok(metadata) => metadata,
            Err(e) => return self.skip(source, DiscoveryDefect::Malformed(e.to_string())),
        };
        match self.validate(&metadata) {
            Ok(factory) => {
                log!(
                    self.diag_level(),
                    "Registered viewer {} {} from {source} for {:?}",
                    metadata.name,
                    metadata.version,
                    metadata.mime_types
                );
                self.descriptors.push(ViewerDescriptor {
                    metadata,
                    source,
                    factory,
                });
            }
            Err(defect) => self.skip(source, defect),
        }
    }

    fn validate(&self, metadata: &PluginMetadata) -> Result<ViewerFactory, DiscoveryDefect> {
        if metadata.iid != VIEWER_INTERFACE_ID {
            return Err(DiscoveryDefect::WrongInterface {
                found: metadata.iid.clone(),
            });
        }
        if metadata.api_major() != Some(PLUGIN_API_VERSION) {
            return Err(DiscoveryDefect::IncompatibleApi {
                found: metadata.api_version.clone(),
            });
        }
        if metadata.mime_types.iter().all(|m| m.trim().is_empty()) {
            return Err(DiscoveryDefect::NoMediaTypes);
        }
        if self.descriptors.iter().any(|d| d.name() == metadata.name) {
            return Err(DiscoveryDefect::DuplicateName {
                name: metadata.name.clone(),
            });
        }
        self.catalog
            .factory(&metadata.entry)
            .ok_or_else(|| DiscoveryDefect::UnknownEntry {
                entry: metadata.entry.clone(),
            })
    }

    fn skip(&mut self, source: DescriptorSource, defect: DiscoveryDefect) {
        let warning = DiscoveryWarning { source, defect };
        warn!("Skipping plugin {warning}");
        self.warnings.push(warning);
    }

    /// First descriptor, in registration order, declaring `media_type`.
    pub fn resolve(&self, media_type: &str) -> Result<&ViewerDescriptor, PluginError> {
        self.descriptors
            .iter()
            .find(|d| d.handles(media_type))
            .ok_or_else(|| PluginError::NoViewer {
                media_type: media_type.to_string(),
            })
    }

    pub fn instantiate(
        &self,
        descriptor: &ViewerDescriptor,
    ) -> Result<Box<dyn Viewer>, PluginError> {
        log!(self.diag_level(), "Instantiating viewer {}", descriptor.name());
        let viewer = (descriptor.factory)().map_err(|reason| PluginError::Instantiate {
            name: descriptor.name().to_string(),
            reason,
        })?;
        let supported = viewer.supported_media_types();
        if supported.is_empty() {
            return Err(PluginError::Instantiate {
                name: descriptor.name().to_string(),
                reason: "viewer declares no media types".to_string(),
            });
        }
        if matches!(descriptor.source(), DescriptorSource::Builtin(_)) {
            let missing: Vec<&String> = descriptor
                .media_types()
                .iter()
                .filter(|m| !supported.iter().any(|s| s.eq_ignore_ascii_case(m)))
                .collect();
            if !missing.is_empty() {
                warn!(
                    "Built-in viewer {} declares {missing:?} but this build supports {supported:?}",
                    descriptor.name()
                );
            }
        }
        debug!("Viewer {} ready", viewer.viewer_name());
        Ok(viewer)
    }

    /// Resolve `media_type` and build a viewer for it.
    ///
    /// A built-in viewer is only handed media types its instance reports as
    /// supported. External manifests may alias any type onto a viewer.
    pub fn viewer_for(&self, media_type: &str) -> Result<Box<dyn Viewer>, PluginError> {
        let descriptor = self.resolve(media_type)?;
        let viewer = self.instantiate(descriptor)?;
        let builtin = matches!(descriptor.source(), DescriptorSource::Builtin(_));
        if builtin
            && !viewer
                .supported_media_types()
                .iter()
                .any(|m| m.eq_ignore_ascii_case(media_type))
        {
            return Err(PluginError::Unsupported {
                name: descriptor.name().to_string(),
                media_type: media_type.to_string(),
            });
        }
        Ok(viewer)
    }

    /// Media type of the first descriptor recognising `ext`
    pub fn media_type_for_extension(&self, ext: &str) -> Option<&str> {
        self.descriptors
            .iter()
            .find(|d| d.recognises_extension(ext))
            .and_then(|d| d.media_types().first())
            .map(String::as_str)
    }

    pub fn descriptors(&self) -> &[ViewerDescriptor] {
        &self.descriptors
    }

    pub fn warnings(&self) -> &[DiscoveryWarning] {
        &self.warnings
    }

    pub fn catalog(&self) -> &ViewerCatalog {
        &self.catalog
    }
}
