//! Purge/retain handlers and batch dispatch

use crate::WatchMetrics;
use pigeon_task::{panic_message, BoxError};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Callback applied to each path of a batch
pub type PathHandler = Arc<dyn Fn(&Path) -> Result<(), BoxError> + Send + Sync>;

/// Which partition a batch came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchKind {
    /// Files at or after the threshold, sent to the retain handler
    Fresh,
    /// Files before the threshold, sent to the purge handler
    Purgeable,
}

impl BatchKind {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchKind::Fresh => "fresh",
            BatchKind::Purgeable => "purgeable",
        }
    }
}

/// The purge and retain handlers of a watcher
#[derive(Clone)]
pub struct HandlerPair {
    /// Applied to every purgeable path
    pub purge: PathHandler,
    /// Applied to every fresh path
    pub retain: PathHandler,
}

impl Default for HandlerPair {
    /// Inert handlers that only log the path
    fn default() -> Self {
        Self {
            purge: Arc::new(|path: &Path| -> Result<(), BoxError> {
                tracing::debug!("Purgeable: {}", path.display());
                Ok(())
            }),
            retain: Arc::new(|path: &Path| -> Result<(), BoxError> {
                tracing::debug!("Fresh: {}", path.display());
                Ok(())
            }),
        }
    }
}

impl HandlerPair {
    /// Handler responsible for `kind`
    pub fn for_kind(&self, kind: BatchKind) -> &PathHandler {
        match kind {
            BatchKind::Fresh => &self.retain,
            BatchKind::Purgeable => &self.purge,
        }
    }
}

/// Apply `handler` to every path, containing errors and panics per item.
///
/// Returns the number of paths whose handler failed.
pub(crate) fn run_batch(
    kind: BatchKind,
    paths: &[PathBuf],
    handler: &PathHandler,
    metrics: &Mutex<WatchMetrics>,
) -> usize {
    let mut failures = 0;

    for path in paths {
        let failed = match panic::catch_unwind(AssertUnwindSafe(|| handler(path))) {
            Ok(Ok(())) => false,
            Ok(Err(e)) => {
                tracing::warn!("{} handler failed for {}: {}", kind.as_str(), path.display(), e);
                true
            }
            Err(payload) => {
                tracing::warn!(
                    "{} handler panicked for {}: {}",
                    kind.as_str(),
                    path.display(),
                    panic_message(payload.as_ref())
                );
                true
            }
        };

        let mut metrics = metrics.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if failed {
            failures += 1;
            metrics.record_failure();
        } else {
            metrics.record_handled(kind);
        }
    }

    tracing::debug!(
        "Finished {} batch of {} paths ({} failed)",
        kind.as_str(),
        paths.len(),
        failures
    );
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_default_handlers_succeed() {
        let handlers = HandlerPair::default();
        assert!((handlers.purge)(Path::new("/tmp/a")).is_ok());
        assert!((handlers.retain)(Path::new("/tmp/b")).is_ok());
    }

    #[test]
    fn test_for_kind() {
        let handlers = HandlerPair::default();
        assert!(Arc::ptr_eq(handlers.for_kind(BatchKind::Fresh), &handlers.retain));
        assert!(Arc::ptr_eq(handlers.for_kind(BatchKind::Purgeable), &handlers.purge));
    }

    #[test]
    fn test_batch_continues_after_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handler: PathHandler = Arc::new(move |path: &Path| -> Result<(), BoxError> {
            counter.fetch_add(1, Ordering::SeqCst);
            if path.ends_with("err") {
                return Err("refused".into());
            }
            if path.ends_with("panic") {
                panic!("handler blew up");
            }
            Ok(())
        });
        let paths = vec![
            PathBuf::from("/w/err"),
            PathBuf::from("/w/panic"),
            PathBuf::from("/w/ok"),
        ];
        let metrics = Mutex::new(WatchMetrics::new());

        let failures = run_batch(BatchKind::Purgeable, &paths, &handler, &metrics);

        assert_eq!(failures, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let metrics = metrics.into_inner().unwrap();
        assert_eq!(metrics.purged, 1);
        assert_eq!(metrics.handler_failures, 2);
    }
}
