//! Viewer plugins.
//!
//! A plugin is a JSON manifest bound to a viewer factory compiled into the
//! binary. Manifests are read eagerly at startup; factories run only when a
//! document of a matching media type is opened.

pub mod catalog;
pub mod error;
pub mod metadata;
pub mod registry;

pub use catalog::{ViewerCatalog, ViewerFactory};
pub use error::{DescriptorSource, DiscoveryDefect, DiscoveryWarning, PluginError};
pub use metadata::{PLUGIN_API_VERSION, PluginMetadata, VIEWER_INTERFACE_ID};
pub use registry::{
    DEBUG_PLUGINS_ENV, PluginRegistry, ViewerDescriptor, default_plugin_dirs, verbose_diagnostics,
};
