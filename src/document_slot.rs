//! The host's single document slot.
//!
//! The slot owns the active viewer and tracks where its document stands.
//! Dropping the viewer is the only way a document is released, so every
//! path out of the slot hands the instance back to the caller, who decides
//! when it dies.

use std::fmt;
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

use crate::viewer::{LoadProgress, Viewer};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SlotState {
    #[default]
    Empty,
    Loading,
    Ready,
    Failed,
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SlotState::Empty => "empty",
            SlotState::Loading => "loading",
            SlotState::Ready => "ready",
            SlotState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlotError {
    #[error("document slot cannot go from {from} to {to}")]
    InvalidTransition { from: SlotState, to: SlotState },
}

/// Whether the slot may move from `from` to `to`.
///
/// `Loading -> Empty` is only legal when the load is being cancelled.
pub fn transition_allowed(from: SlotState, to: SlotState, cancelling: bool) -> bool {
    use SlotState::*;
    matches!(
        (from, to),
        (Empty, Loading) | (Loading, Ready) | (Loading, Failed) | (Ready, Empty) | (Failed, Empty)
    ) || (cancelling && from == Loading && to == Empty)
}

/// What the slot knows about the document it holds
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenDocument {
    pub path: PathBuf,
    pub media_type: String,
}

#[derive(Default)]
pub struct DocumentSlot {
    state: SlotState,
    viewer: Option<Box<dyn Viewer>>,
    document: Option<OpenDocument>,
    pending: Option<PathBuf>,
}

impl DocumentSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn is_empty(&self) -> bool {
        self.state == SlotState::Empty
    }

    pub fn is_loading(&self) -> bool {
        self.state == SlotState::Loading
    }

    pub fn viewer(&self) -> Option<&dyn Viewer> {
        self.viewer.as_deref()
    }

    pub fn viewer_mut(&mut self) -> Option<&mut (dyn Viewer + 'static)> {
        self.viewer.as_deref_mut()
    }

    pub fn document(&self) -> Option<&OpenDocument> {
        self.document.as_ref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.document.as_ref().map(|doc| doc.path.as_path())
    }

    fn transition(&mut self, to: SlotState, cancelling: bool) -> Result<(), SlotError> {
        if !transition_allowed(self.state, to, cancelling) {
            return Err(SlotError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        debug!("Document slot: {} -> {}", self.state, to);
        self.state = to;
        Ok(())
    }

    /// Take ownership of a freshly initialised viewer. The slot must be empty.
    pub fn begin(
        &mut self,
        viewer: Box<dyn Viewer>,
        path: &Path,
        media_type: &str,
    ) -> Result<(), SlotError> {
        self.transition(SlotState::Loading, false)?;
        self.viewer = Some(viewer);
        self.document = Some(OpenDocument {
            path: path.to_path_buf(),
            media_type: media_type.to_string(),
        });
        Ok(())
    }

    /// Record the outcome of a viewer's load poll.
    ///
    /// Returns the state the slot moved to, or `None` while still loading or
    /// when nothing is loading.
    pub fn settle(&mut self, progress: LoadProgress) -> Result<Option<SlotState>, SlotError> {
        if self.state != SlotState::Loading {
            return Ok(None);
        }
        let to = match progress {
            LoadProgress::Pending => return Ok(None),
            LoadProgress::Loaded => SlotState::Ready,
            LoadProgress::Failed => SlotState::Failed,
        };
        self.transition(to, false)?;
        Ok(Some(to))
    }

    /// Give up a settled document. Releasing an empty slot is a no-op; a
    /// loading slot must be cancelled instead.
    pub fn release(&mut self) -> Result<Option<Box<dyn Viewer>>, SlotError> {
        if self.state == SlotState::Empty {
            return Ok(None);
        }
        self.transition(SlotState::Empty, false)?;
        self.document = None;
        Ok(self.viewer.take())
    }

    /// Abandon an in-flight load.
    pub fn cancel(&mut self) -> Result<Option<Box<dyn Viewer>>, SlotError> {
        self.transition(SlotState::Empty, true)?;
        self.document = None;
        Ok(self.viewer.take())
    }

    /// Remember an open request that arrived mid-load. Only the latest one is
    /// kept; the one it replaces is returned.
    pub fn queue_open(&mut self, path: &Path) -> Option<PathBuf> {
        self.pending.replace(path.to_path_buf())
    }

    pub fn pending(&self) -> Option<&Path> {
        self.pending.as_deref()
    }

    pub fn take_pending(&mut self) -> Option<PathBuf> {
        self.pending.take()
    }
}
