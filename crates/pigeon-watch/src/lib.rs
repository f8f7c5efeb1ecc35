//! Pigeon Watch
//!
//! Threshold-based directory freshness watcher.
//!
//! # Overview
//!
//! A [`DirWatcher`] walks a directory tree and splits its files in two:
//! - **Fresh**: the file's timestamp is at or after the scan threshold
//! - **Purgeable**: the file's timestamp is before the threshold
//!
//! Each non-empty partition is handed to its handler (retain or purge) on a
//! worker thread of its own. A handler failing on one path is logged and the
//! batch moves on to the next path.
//!
//! The polling controller started by [`DirWatcher::bootstrap`] repeats the
//! scan every poll interval, moving the threshold to the end of the previous
//! scan, so after the first tick only files touched since the last scan are
//! fresh.
//!
//! # Usage
//!
//! ## One-time Scan
//!
//! ```no_run
//! use pigeon_watch::{DirWatcher, WatcherConfig};
//! use std::time::{Duration, SystemTime};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let watcher = DirWatcher::new("/var/spool/images", WatcherConfig::default())?;
//! watcher.set_purge_handler(|path| Ok(std::fs::remove_file(path)?));
//!
//! let hour_ago = SystemTime::now() - Duration::from_secs(3600);
//! let outcome = watcher.scan_once(hour_ago, Some(0))?;
//! for handle in outcome.handles() {
//!     watcher.join(handle);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Background Controller
//!
//! ```no_run
//! use pigeon_watch::DirWatcher;
//! use std::time::{Duration, SystemTime};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let watcher = DirWatcher::with_poll_interval(".", Duration::from_secs(10))?;
//! let controller = watcher.bootstrap(SystemTime::now())?;
//!
//! // ... later
//! watcher.kill(&controller);
//! println!("{}", watcher.metrics().summary());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! ```toml
//! poll_interval_ms = 10000
//! max_depth = 2            # omit to walk the whole tree
//! timestamp = "created"    # created | accessed | modified
//! ```

#![warn(missing_docs)]

mod classify;
mod config;
mod error;
mod handlers;
mod metrics;
mod watcher;

pub use classify::{
    access_time, classify_tree, creation_time, modification_time, Classification, Classifier,
};
pub use config::{TimestampSource, WatcherConfig, DEFAULT_POLL_INTERVAL};
pub use error::WatchError;
pub use handlers::{BatchKind, HandlerPair, PathHandler};
pub use metrics::WatchMetrics;
pub use watcher::{DirWatcher, ScanOutcome};

pub use pigeon_task::{BoxError, KillOutcome, TaskHandle};
