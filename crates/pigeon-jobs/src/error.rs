//! Error types for the job runner

use pigeon_task::{BoxError, TaskError};
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a job's own callable, captured into [`JobResult::Failed`](crate::JobResult::Failed)
#[derive(Error, Debug)]
pub enum JobError {
    /// The callable returned an error
    #[error("Job failed: {0}")]
    Failed(BoxError),

    /// The callable panicked
    #[error("Job panicked: {0}")]
    Panicked(String),

    /// The callable was already consumed by an earlier attempt
    #[error("Job '{0}' already ran")]
    AlreadyRun(String),
}

/// Errors raised by the runner itself
#[derive(Error, Debug)]
pub enum JobRunnerError {
    /// Could not start a worker thread
    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    /// Configuration file could not be read
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
