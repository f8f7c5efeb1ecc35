//! Error types for directory watching

use pigeon_task::TaskError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while constructing or running a watcher
#[derive(Error, Debug)]
pub enum WatchError {
    /// Watch target does not exist
    #[error("Unknown directory: {0}")]
    NotFound(PathBuf),

    /// Watch target exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Filesystem error on the watch root
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Could not start a batch or controller thread
    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
