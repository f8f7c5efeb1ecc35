//! Configuration for the job runner

use crate::{JobRunnerError, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for a [`JobRunner`](crate::JobRunner)
///
/// # Examples
///
/// ```
/// use pigeon_jobs::JobRunnerConfig;
/// use std::time::Duration;
///
/// let config = JobRunnerConfig::from_toml_str("max_attempts = 3").unwrap();
/// let policy = config.retry_policy();
/// assert_eq!(policy.backoff, Duration::from_millis(200));
/// assert_eq!(policy.max_attempts, Some(3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRunnerConfig {
    /// Pause between contended attempts (in milliseconds)
    /// Default: 200
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Attempts before a contended job gives up
    /// Default: unbounded
    #[serde(default)]
    pub max_attempts: Option<u32>,

    /// Double the pause after every contended attempt
    #[serde(default)]
    pub exponential_backoff: bool,

    /// Ceiling for exponential pauses (in milliseconds)
    /// Default: 5000
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_retry_backoff_ms() -> u64 {
    200
}

fn default_max_backoff_ms() -> u64 {
    5000
}

impl Default for JobRunnerConfig {
    fn default() -> Self {
        Self {
            retry_backoff_ms: default_retry_backoff_ms(),
            max_attempts: None,
            exponential_backoff: false,
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl JobRunnerConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, JobRunnerError> {
        toml::from_str(contents).map_err(|e| JobRunnerError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, JobRunnerError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| JobRunnerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Build the retry policy described by this configuration
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            backoff: Duration::from_millis(self.retry_backoff_ms),
            max_attempts: self.max_attempts,
            exponential: self.exponential_backoff,
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }
}
