//! Error types for task spawning

use thiserror::Error;

/// Errors that can occur while starting a task
#[derive(Error, Debug)]
pub enum TaskError {
    /// The operating system refused to start a new thread
    #[error("Failed to spawn task '{name}': {source}")]
    Spawn {
        /// Name of the task that could not be started
        name: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
