//! Background document loads.
//!
//! Parsing never runs on the UI thread. A viewer hands a job to
//! [`LoadTask::spawn`], which runs it on a worker thread and sends the result
//! back over a single-slot channel that the UI thread polls once per tick.
//! Dropping the task cancels it; a worker that finishes afterwards finds the
//! receiver gone and its result is discarded.

use std::fs::File;
use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;

use flume::{Receiver, TryRecvError};
use log::{debug, error};

const READ_CHUNK: usize = 64 * 1024;

static NEXT_LOAD_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a load, used in logs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LoadId(pub u64);

impl LoadId {
    fn next() -> Self {
        Self(NEXT_LOAD_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Shared cancellation flag between a task handle and its worker
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Errors from load workers
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("load cancelled")]
    Cancelled,

    #[error("file is too large ({size} bytes, limit is {limit})")]
    TooLarge { size: u64, limit: u64 },

    #[error("{detail}")]
    Parse { detail: String },

    #[error("loader thread exited without a result")]
    WorkerLost,
}

impl LoadError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse { detail: msg.into() }
    }
}

/// Result of polling a task
#[derive(Debug)]
pub enum TaskPoll<T> {
    Pending,
    Done(Result<T, LoadError>),
}

/// Handle to one in-flight load
pub struct LoadTask<T> {
    id: LoadId,
    token: CancelToken,
    response_rx: Receiver<Result<T, LoadError>>,
    finished: bool,
}

impl<T: Send + 'static> LoadTask<T> {
    /// Run `job` on a dedicated worker thread.
    pub fn spawn<F>(label: &str, job: F) -> Self
    where
        F: FnOnce(&CancelToken) -> Result<T, LoadError> + Send + 'static,
    {
        let id = LoadId::next();
        let token = CancelToken::new();
        let (response_tx, response_rx) = flume::bounded(1);

        let worker_token = token.clone();
        let worker_tx = response_tx.clone();
        let spawned = thread::Builder::new()
            .name(format!("load-{label}-{}", id.0))
            .spawn(move || {
                let result = job(&worker_token);
                if worker_token.is_cancelled() {
                    debug!("Load {id:?} finished after cancellation, result dropped");
                    return;
                }
                if worker_tx.send(result).is_err() {
                    debug!("Load {id:?} completed after its viewer was torn down, dropped");
                }
            });

        if let Err(e) = spawned {
            error!("Failed to spawn loader thread for {label}: {e}");
            let _ = response_tx.send(Err(LoadError::Io(e)));
        }

        debug!("Spawned load {id:?} for {label}");
        Self {
            id,
            token,
            response_rx,
            finished: false,
        }
    }
}

impl<T> LoadTask<T> {
    pub fn id(&self) -> LoadId {
        self.id
    }

    /// Non-blocking check for the worker's result.
    pub fn poll(&mut self) -> TaskPoll<T> {
        if self.finished {
            return TaskPoll::Done(Err(LoadError::WorkerLost));
        }
        let poll = match self.response_rx.try_recv() {
            Ok(result) => TaskPoll::Done(result),
            Err(TryRecvError::Empty) => TaskPoll::Pending,
            Err(TryRecvError::Disconnected) => {
                if self.token.is_cancelled() {
                    TaskPoll::Done(Err(LoadError::Cancelled))
                } else {
                    TaskPoll::Done(Err(LoadError::WorkerLost))
                }
            }
        };
        if matches!(poll, TaskPoll::Done(_)) {
            self.finished = true;
        }
        poll
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl<T> Drop for LoadTask<T> {
    fn drop(&mut self) {
        if !self.finished && !self.token.is_cancelled() {
            debug!("Cancelling load {:?}", self.id);
        }
        self.token.cancel();
    }
}

/// Read a whole file in chunks, bailing out between chunks once cancelled.
pub fn read_to_end_cancellable(
    mut file: File,
    token: &CancelToken,
    limit: Option<u64>,
) -> Result<Vec<u8>, LoadError> {
    let size_hint = file.metadata().map(|m| m.len()).unwrap_or(0);
    if let Some(limit) = limit {
        if size_hint > limit {
            return Err(LoadError::TooLarge {
                size: size_hint,
                limit,
            });
        }
    }

    let mut bytes = Vec::with_capacity(size_hint as usize);
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        if token.is_cancelled() {
            return Err(LoadError::Cancelled);
        }
        let read = file.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..read]);
        if let Some(limit) = limit {
            if bytes.len() as u64 > limit {
                return Err(LoadError::TooLarge {
                    size: bytes.len() as u64,
                    limit,
                });
            }
        }
    }
    Ok(bytes)
}
