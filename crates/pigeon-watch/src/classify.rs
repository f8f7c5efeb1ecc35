//! Tree walking and fresh/purgeable classification

use crate::{TimestampSource, WatchError};
use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use walkdir::{DirEntry, WalkDir};

/// Reads the timestamp that decides whether a file is fresh
pub type Classifier = Arc<dyn Fn(&Path) -> io::Result<SystemTime> + Send + Sync>;

/// Creation time of `path`, or its modification time where the platform
/// does not record creation times
pub fn creation_time(path: &Path) -> io::Result<SystemTime> {
    let metadata = fs::metadata(path)?;
    match metadata.created() {
        Err(e) if e.kind() == io::ErrorKind::Unsupported => metadata.modified(),
        other => other,
    }
}

/// Last access time of `path`
pub fn access_time(path: &Path) -> io::Result<SystemTime> {
    fs::metadata(path)?.accessed()
}

/// Last modification time of `path`
pub fn modification_time(path: &Path) -> io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}

impl TimestampSource {
    /// Classifier reading this timestamp
    pub fn classifier(self) -> Classifier {
        let read: fn(&Path) -> io::Result<SystemTime> = match self {
            TimestampSource::Created => creation_time,
            TimestampSource::Accessed => access_time,
            TimestampSource::Modified => modification_time,
        };
        Arc::new(read)
    }
}

/// Result of walking a tree against a threshold.
///
/// `fresh` and `purgeable` are disjoint and keep walk order: files of a
/// directory in name order, then its subdirectories in name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Files whose timestamp is at or after the threshold
    pub fresh: Vec<PathBuf>,
    /// Files whose timestamp is before the threshold
    pub purgeable: Vec<PathBuf>,
    /// Entries skipped because they could not be read
    pub unreadable: usize,
}

impl Classification {
    /// Number of classified files
    pub fn len(&self) -> usize {
        self.fresh.len() + self.purgeable.len()
    }

    /// Whether no files were classified
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Walk `root` down to `max_depth` directory levels and partition every file
/// by comparing `classifier`'s timestamp to `threshold`.
///
/// Only a failure to read `root` itself is an error. Unreadable
/// subdirectories and files are logged, counted and skipped. Symlinked
/// directories are not followed.
pub fn classify_tree(
    root: &Path,
    threshold: SystemTime,
    max_depth: Option<usize>,
    classifier: &Classifier,
) -> Result<Classification, WatchError> {
    let mut result = Classification::default();

    // Entries directly under the root sit at walk depth 1.
    let walker = WalkDir::new(root)
        .follow_links(false)
        .max_depth(max_depth.map_or(usize::MAX, |depth| depth.saturating_add(1)))
        .sort_by(files_first);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(WatchError::Io {
                    path: root.to_path_buf(),
                    source: e.into(),
                });
            }
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                result.unreadable += 1;
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_dir() || (file_type.is_symlink() && entry.path().is_dir()) {
            continue;
        }

        let path = entry.into_path();
        match classifier(&path) {
            Ok(stamp) if stamp >= threshold => result.fresh.push(path),
            Ok(_) => result.purgeable.push(path),
            Err(e) => {
                tracing::warn!("Cannot read timestamp of {}: {}", path.display(), e);
                result.unreadable += 1;
            }
        }
    }

    Ok(result)
}

/// Files before subdirectories, each group in name order
fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}
