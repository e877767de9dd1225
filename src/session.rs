use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::recent::RecentFiles;

pub const SESSION_FILENAME: &str = "session.json";
pub const DEFAULT_SIDEBAR_PERCENT: u16 = 30;

/// Window layout remembered between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub columns: u16,
    pub rows: u16,
    pub sidebar_percent: u16,
    pub overview_visible: bool,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            columns: 0,
            rows: 0,
            sidebar_percent: DEFAULT_SIDEBAR_PERCENT,
            overview_visible: true,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub geometry: Geometry,
    #[serde(default)]
    pub last_directory: Option<PathBuf>,
    #[serde(default)]
    pub recent: RecentFiles,
    #[serde(skip)]
    file_path: Option<PathBuf>,
}

impl Session {
    /// A session that is never written to disk
    pub fn ephemeral() -> Self {
        Self::default()
    }

    pub fn with_file(file_path: &Path) -> Self {
        Self {
            file_path: Some(file_path.to_path_buf()),
            ..Self::default()
        }
    }

    pub fn load_or_ephemeral(file_path: Option<&Path>) -> Self {
        match file_path {
            Some(path) => Self::load_from_file(path).unwrap_or_else(|e| {
                log::error!("Failed to load session from {path:?}: {e}");
                Self::with_file(path)
            }),
            None => Self::ephemeral(),
        }
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let mut session: Self = serde_json::from_str(&content)?;
            session.file_path = Some(path.to_path_buf());
            Ok(session)
        } else {
            Ok(Self::with_file(path))
        }
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Write the session, replacing the old file atomically.
    pub fn save(&self) -> anyhow::Result<()> {
        let Some(path) = &self.file_path else {
            return Ok(());
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let content = serde_json::to_string_pretty(self)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(path)?;
        log::debug!("Saved session to {path:?}");
        Ok(())
    }
}
