use std::fmt;
use std::path::PathBuf;

use super::metadata::PLUGIN_API_VERSION;

#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("no viewer registered for {media_type}")]
    NoViewer { media_type: String },

    #[error("cannot instantiate {name}: {reason}")]
    Instantiate { name: String, reason: String },

    #[error("{name} cannot decode {media_type} in this build")]
    Unsupported { name: String, media_type: String },
}

/// Where a descriptor's manifest came from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DescriptorSource {
    Builtin(String),
    Manifest(PathBuf),
}

impl fmt::Display for DescriptorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorSource::Builtin(entry) => write!(f, "built-in:{entry}"),
            DescriptorSource::Manifest(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Reason a manifest was skipped during discovery
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DiscoveryDefect {
    #[error("unreadable manifest: {0}")]
    Unreadable(String),

    #[error("malformed manifest: {0}")]
    Malformed(String),

    #[error("interface {found:?} is not a viewer interface")]
    WrongInterface { found: String },

    #[error("API version {found:?} is incompatible with {}", PLUGIN_API_VERSION)]
    IncompatibleApi { found: String },

    #[error("no compiled viewer named {entry:?}")]
    UnknownEntry { entry: String },

    #[error("declares no media types")]
    NoMediaTypes,

    #[error("duplicate plugin name {name:?}")]
    DuplicateName { name: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveryWarning {
    pub source: DescriptorSource,
    pub defect: DiscoveryDefect,
}

impl fmt::Display for DiscoveryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.defect)
    }
}
