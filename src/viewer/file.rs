use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// A document handed to a viewer by the host.
///
/// The handle is opened by the viewer, not the host, and belongs to exactly
/// one viewer instance. It is closed when the `DocumentFile` is dropped or
/// when the handle has been moved into a load worker that finishes.
#[derive(Debug)]
pub struct DocumentFile {
    path: PathBuf,
    handle: Option<File>,
}

impl DocumentFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            handle: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without directories, used in status messages and titles
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.to_string_lossy().to_string())
    }

    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    pub fn open(&mut self) -> io::Result<()> {
        if self.handle.is_none() {
            self.handle = Some(File::open(&self.path)?);
        }
        Ok(())
    }

    /// Move the open handle out, opening it first if needed.
    pub fn take_handle(&mut self) -> io::Result<File> {
        self.open()?;
        self.handle
            .take()
            .ok_or_else(|| io::Error::other("file handle already taken"))
    }
}
