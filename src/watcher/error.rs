//! Watcher error types.

use std::path::PathBuf;

/// Errors that can occur while reading a watched log.
///
/// All of these are transient from the monitor's point of view: they are
/// retried on the next tick and never reach the caller directly.
#[derive(thiserror::Error, Debug)]
pub enum WatcherError {
    /// Permission denied accessing file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// File is held open exclusively by the writing process.
    #[error("File locked by another process: {0}")]
    Locked(PathBuf),

    /// Path exists but is not a regular file.
    #[error("Not a regular file: {0}")]
    NotAFile(PathBuf),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatcherError {
    /// Classify an error returned while opening `path`.
    pub(crate) fn from_open(path: &std::path::Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            return Self::PermissionDenied(path.to_path_buf());
        }
        // ERROR_SHARING_VIOLATION / ERROR_LOCK_VIOLATION
        if cfg!(windows) && matches!(err.raw_os_error(), Some(32 | 33)) {
            return Self::Locked(path.to_path_buf());
        }
        Self::Io(err)
    }
}
