use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::recent::DEFAULT_MAX_RECENT;

pub const CURRENT_VERSION: u32 = 2;
pub const APP_NAME: &str = "docview";
const SETTINGS_FILENAME: &str = "config.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_theme")]
    pub theme: String,

    #[serde(default = "default_max_recent")]
    pub max_recent_files: usize,

    /// Extra directories scanned for viewer manifests, after the built-ins
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugin_dirs: Vec<PathBuf>,

    #[serde(default = "default_true")]
    pub restore_document_state: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print_directory: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_theme() -> String {
    "Oceanic Next".to_string()
}

fn default_max_recent() -> usize {
    DEFAULT_MAX_RECENT
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            theme: default_theme(),
            max_recent_files: default_max_recent(),
            plugin_dirs: Vec::new(),
            restore_document_state: true,
            print_directory: None,
        }
    }
}

pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME))
}

pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(SETTINGS_FILENAME))
}

impl Settings {
    /// Load settings from the default location, writing defaults on first run.
    pub fn load() -> Self {
        match default_config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                warn!("Could not determine config directory, using default settings");
                Self::default()
            }
        }
    }

    /// Load from `path`. A missing file is created with defaults; an
    /// unreadable or malformed one is left alone and defaults are used.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("Settings file not found, creating with defaults at {path:?}");
            let settings = Self::default();
            settings.save_to(path);
            return settings;
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str::<Settings>(&content) {
                Ok(mut settings) => {
                    debug!("Loaded settings from {path:?}");
                    if settings.version < CURRENT_VERSION {
                        migrate_settings(&mut settings);
                        settings.save_to(path);
                    }
                    settings
                }
                Err(e) => {
                    error!("Failed to parse settings file {path:?}: {e}");
                    Self::default()
                }
            },
            Err(e) => {
                error!("Failed to read settings file {path:?}: {e}");
                Self::default()
            }
        }
    }

    pub fn save(&self) {
        match default_config_path() {
            Some(path) => self.save_to(&path),
            None => warn!("Could not determine config directory, cannot save settings"),
        }
    }

    pub fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                if let Err(e) = fs::create_dir_all(parent) {
                    error!("Failed to create config directory {parent:?}: {e}");
                    return;
                }
            }
        }

        let content = match serde_yaml::to_string(self) {
            Ok(yaml) => format!("{SETTINGS_HEADER}{yaml}"),
            Err(e) => {
                error!("Failed to serialize settings: {e}");
                return;
            }
        };

        match fs::write(path, content) {
            Ok(()) => debug!("Saved settings to {path:?}"),
            Err(e) => error!("Failed to save settings to {path:?}: {e}"),
        }
    }

    /// Directory printed documents are written to.
    pub fn print_directory(&self) -> PathBuf {
        self.print_directory
            .clone()
            .or_else(dirs::document_dir)
            .unwrap_or_else(std::env::temp_dir)
    }
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );

    // v1 allowed a zero-length recent list, which now means "use the default".
    if settings.version < 2 && settings.max_recent_files == 0 {
        settings.max_recent_files = DEFAULT_MAX_RECENT;
    }

    settings.version = CURRENT_VERSION;
}

const SETTINGS_HEADER: &str = r#"# ============================================================================
# docview settings
# ============================================================================
# theme:                  "Oceanic Next" or "Catppuccin Mocha"
# max_recent_files:       entries kept in the recent files list
# plugin_dirs:            extra directories with viewer manifests (*.json)
# restore_document_state: reopen documents where they were left
# print_directory:        where printed documents are written

"#;
