use std::fs::File;

use log::{debug, warn};

use crate::cursor::CursorShape;

use super::file::DocumentFile;
use super::host::HostContext;
use super::task::{CancelToken, LoadError, LoadTask, TaskPoll};
use super::LoadProgress;

/// Bookkeeping shared by every concrete viewer.
///
/// Composed into a viewer as a field: it holds the bound document file, the
/// in-flight load task and the load outcome, and keeps the host's busy cursor
/// balanced around the load. Dropping the base drops the task, which cancels
/// the worker.
pub struct ViewerBase<T> {
    name: &'static str,
    file: Option<DocumentFile>,
    task: Option<LoadTask<T>>,
    early_failure: Option<LoadError>,
    progress: LoadProgress,
    busy: bool,
    #[cfg(feature = "print")]
    printing_enabled: bool,
}

impl<T> ViewerBase<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            file: None,
            task: None,
            early_failure: None,
            progress: LoadProgress::Pending,
            busy: false,
            #[cfg(feature = "print")]
            printing_enabled: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn bind(&mut self, file: DocumentFile) {
        debug!("{} bound to {:?}", self.name, file.path());
        self.file = Some(file);
        self.progress = LoadProgress::Pending;
        #[cfg(feature = "print")]
        self.disable_printing();
    }

    pub fn file(&self) -> Option<&DocumentFile> {
        self.file.as_ref()
    }

    pub fn file_name(&self) -> String {
        self.file
            .as_ref()
            .map(DocumentFile::display_name)
            .unwrap_or_default()
    }

    pub fn is_loading(&self) -> bool {
        self.task.is_some()
    }

    pub fn progress(&self) -> LoadProgress {
        self.progress
    }

    pub fn status_message(&self, host: &mut HostContext<'_>, message: impl Into<String>) {
        host.status_message(message, self.name);
    }
}

impl<T: Send + 'static> ViewerBase<T> {
    /// Open the bound file and parse it on a worker thread.
    ///
    /// The handle moves into the worker. An open failure is not reported
    /// here; it surfaces on the next poll like any other load failure.
    pub fn begin_load<F>(&mut self, host: &mut HostContext<'_>, job: F)
    where
        F: FnOnce(File, &CancelToken) -> Result<T, LoadError> + Send + 'static,
    {
        let handle = match self.file.as_mut() {
            Some(file) => file.take_handle(),
            None => Err(std::io::Error::other("no document bound")),
        };
        let handle = match handle {
            Ok(handle) => handle,
            Err(e) => {
                warn!("{} could not open {:?}: {e}", self.name, self.file_name());
                self.early_failure = Some(LoadError::Io(e));
                return;
            }
        };

        host.set_override_cursor(CursorShape::Wait);
        self.busy = true;
        self.task = Some(LoadTask::spawn(self.name, move |token| job(handle, token)));
    }

    /// Drive the load one step.
    ///
    /// `apply` receives the parsed document on the UI thread once the worker
    /// finishes; an error from it fails the load the same way a worker error
    /// does. Once settled the outcome is sticky.
    pub fn poll_load<F>(&mut self, host: &mut HostContext<'_>, apply: F) -> LoadProgress
    where
        F: FnOnce(T, &mut HostContext<'_>) -> Result<(), LoadError>,
    {
        if self.progress != LoadProgress::Pending {
            return self.progress;
        }

        let result = if let Some(err) = self.early_failure.take() {
            Err(err)
        } else if let Some(task) = self.task.as_mut() {
            match task.poll() {
                TaskPoll::Pending => return LoadProgress::Pending,
                TaskPoll::Done(result) => {
                    self.task = None;
                    result
                }
            }
        } else {
            Err(LoadError::parse("no document bound"))
        };

        if self.busy {
            host.restore_override_cursor();
            self.busy = false;
        }

        self.progress = match result.and_then(|document| apply(document, host)) {
            Ok(()) => LoadProgress::Loaded,
            Err(e) => {
                warn!("{} failed to load {}: {e}", self.name, self.file_name());
                host.status_error(format!("Cannot load {}: {e}", self.file_name()), self.name);
                LoadProgress::Failed
            }
        };
        self.progress
    }
}

#[cfg(feature = "print")]
impl<T> ViewerBase<T> {
    pub fn disable_printing(&mut self) {
        self.printing_enabled = false;
    }

    /// Printing is only offered once there is something to print.
    pub fn maybe_enable_printing(&mut self, has_content: bool) {
        self.printing_enabled = has_content;
    }

    pub fn printing_enabled(&self) -> bool {
        self.printing_enabled
    }
}
