//! Error handling for the threading library.
//!
//! Fallible operations return [`ThreadingResult`]. Errors are grouped per
//! concern and convert into [`ThreadingError`] with `?`.

use thiserror::Error;

/// Result type for threading operations.
pub type ThreadingResult<T> = Result<T, ThreadingError>;

/// Top-level error type for all threading operations.
#[derive(Debug, Error)]
pub enum ThreadingError {
    /// Thread spawning errors
    #[error("thread spawn error: {0}")]
    Spawn(#[from] SpawnError),
    /// Thread joining errors
    #[error("thread join error: {0}")]
    Join(#[from] JoinError),
    /// CPU pinning errors
    #[error("affinity error: {0}")]
    Affinity(#[from] AffinityError),
}

/// Errors that can occur while starting threads.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// The operating system refused to create the thread
    #[error("os refused to create thread: {0}")]
    Os(#[from] std::io::Error),
    /// A wall was started with no thread contexts
    #[error("cannot start an empty wall of threads")]
    EmptyWall,
}

/// Errors that can occur while joining threads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    /// The thread body panicked
    #[error("thread {index} panicked")]
    Panicked { index: u32 },
}

/// Errors that can occur while pinning a thread to a core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AffinityError {
    /// Core index is beyond what the platform can address
    #[error("core index {0} is out of range")]
    CoreOutOfRange(usize),
    /// The affinity syscall failed
    #[error("cannot pin thread to core {core}: {reason}")]
    Os { core: usize, reason: String },
    /// Pinning is not implemented for this platform
    #[error("thread affinity is not supported on this platform")]
    Unsupported,
}

impl From<std::io::Error> for ThreadingError {
    fn from(error: std::io::Error) -> Self {
        ThreadingError::Spawn(SpawnError::Os(error))
    }
}

impl ThreadingError {
    /// Whether the error is a panic in a joined thread.
    pub fn is_panic(&self) -> bool {
        matches!(self, ThreadingError::Join(JoinError::Panicked { .. }))
    }
}
