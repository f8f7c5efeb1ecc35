//! Configuration for directory watching
//!
//! Defines the poll interval, scan depth and timestamp source.

use crate::WatchError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Poll interval used when none (or zero) is configured
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Which file timestamp decides freshness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampSource {
    /// Creation time (modification time where the platform has none)
    #[default]
    Created,
    /// Last access time
    Accessed,
    /// Last modification time
    Modified,
}

impl TimestampSource {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TimestampSource::Created => "created",
            TimestampSource::Accessed => "accessed",
            TimestampSource::Modified => "modified",
        }
    }
}

/// Configuration for a [`DirWatcher`](crate::DirWatcher)
///
/// # Examples
///
/// ```
/// use pigeon_watch::{TimestampSource, WatcherConfig};
/// use std::time::Duration;
///
/// let config = WatcherConfig::default();
/// assert_eq!(config.poll_interval(), Duration::from_secs(10));
/// assert_eq!(config.max_depth, None);
/// assert_eq!(config.timestamp, TimestampSource::Created);
///
/// let config = WatcherConfig::from_toml_str("poll_interval_ms = 500\nmax_depth = 2").unwrap();
/// assert_eq!(config.poll_interval(), Duration::from_millis(500));
/// assert_eq!(config.max_depth, Some(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Pause between scans (in milliseconds)
    /// Default: 10 seconds. Zero falls back to the default.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Directory levels below the root to descend into
    /// `None` scans the whole tree, `Some(0)` only the root directory.
    #[serde(default)]
    pub max_depth: Option<usize>,

    /// Timestamp compared against the scan threshold
    /// Default: creation time
    #[serde(default)]
    pub timestamp: TimestampSource,
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_depth: None,
            timestamp: TimestampSource::default(),
        }
    }
}

impl WatcherConfig {
    /// Configuration with the given poll interval and defaults otherwise.
    ///
    /// Sub-millisecond parts round up; a zero interval selects the default.
    pub fn with_poll_interval(interval: Duration) -> Self {
        let millis = interval.as_nanos().div_ceil(1_000_000);
        Self {
            poll_interval_ms: u64::try_from(millis).unwrap_or(u64::MAX),
            ..Default::default()
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, WatchError> {
        toml::from_str(contents).map_err(|e| WatchError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, WatchError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| WatchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Get poll interval as Duration
    pub fn poll_interval(&self) -> Duration {
        if self.poll_interval_ms == 0 {
            DEFAULT_POLL_INTERVAL
        } else {
            Duration::from_millis(self.poll_interval_ms)
        }
    }
}
