use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_RECENT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentEntry {
    pub path: PathBuf,
    pub last_opened: DateTime<Utc>,
    /// Viewer state saved when the document was last closed
    #[serde(default, with = "blob_base64", skip_serializing_if = "Option::is_none")]
    pub state: Option<Vec<u8>>,
}

impl RecentEntry {
    pub fn title(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.to_string_lossy().to_string())
    }
}

/// Bounded most-recent-first list of opened documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentFiles {
    entries: Vec<RecentEntry>,
    #[serde(skip, default = "default_capacity")]
    capacity: usize,
}

fn default_capacity() -> usize {
    DEFAULT_MAX_RECENT
}

impl Default for RecentFiles {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_RECENT)
    }
}

impl RecentFiles {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the bound, evicting the oldest entries if needed.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.entries.truncate(self.capacity);
    }

    /// Move `path` to the front, keeping any state it already had.
    pub fn touch(&mut self, path: &Path) {
        let existing = self.remove(path);
        let entry = RecentEntry {
            path: path.to_path_buf(),
            last_opened: Utc::now(),
            state: existing.and_then(|e| e.state),
        };
        self.entries.insert(0, entry);
        if self.entries.len() > self.capacity {
            if let Some(evicted) = self.entries.pop() {
                log::debug!("Evicted {:?} from recent files", evicted.path);
            }
        }
    }

    pub fn set_state(&mut self, path: &Path, state: Vec<u8>) -> bool {
        match self.entries.iter_mut().find(|e| e.path == path) {
            Some(entry) => {
                entry.state = (!state.is_empty()).then_some(state);
                true
            }
            None => false,
        }
    }

    pub fn state_for(&self, path: &Path) -> Option<&[u8]> {
        self.get(path).and_then(|e| e.state.as_deref())
    }

    pub fn get(&self, path: &Path) -> Option<&RecentEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    pub fn remove(&mut self, path: &Path) -> Option<RecentEntry> {
        let index = self.entries.iter().position(|e| e.path == path)?;
        Some(self.entries.remove(index))
    }

    pub fn entries(&self) -> &[RecentEntry] {
        &self.entries
    }

    pub fn most_recent(&self) -> Option<&RecentEntry> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Saved-state blobs travel as base64 strings inside the session JSON.
mod blob_base64 {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        blob: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match blob {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        match encoded {
            // An undecodable blob is dropped rather than failing the whole session.
            Some(text) => Ok(STANDARD.decode(text.as_bytes()).ok()),
            None => Ok(None),
        }
    }
}
