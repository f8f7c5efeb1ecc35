//! Directory watcher: scans, batch dispatch and the polling controller

use crate::classify::{classify_tree, Classification, Classifier};
use crate::handlers::{run_batch, BatchKind, HandlerPair, PathHandler};
use crate::{WatchError, WatchMetrics, WatcherConfig};
use pigeon_task::{BoxError, CancellationToken, KillOutcome, TaskHandle, TaskRegistry};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant, SystemTime};

/// Handles of the batches started by one scan
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// Batch applying the retain handler, absent when nothing was fresh
    pub fresh: Option<TaskHandle>,
    /// Batch applying the purge handler, absent when nothing was purgeable
    pub purgeable: Option<TaskHandle>,
    /// Number of fresh files
    pub fresh_count: usize,
    /// Number of purgeable files
    pub purgeable_count: usize,
}

impl ScanOutcome {
    /// Started batch handles, purgeable first
    pub fn handles(&self) -> impl Iterator<Item = &TaskHandle> {
        self.purgeable.iter().chain(self.fresh.iter())
    }
}

/// Watches a directory tree and sorts its files into fresh and purgeable
/// against a moving time threshold.
///
/// Each scan hands the two partitions to the retain and purge handlers on
/// separate worker threads. [`bootstrap`](Self::bootstrap) runs scans on a
/// controller thread every poll interval until killed.
///
/// # Examples
///
/// ```no_run
/// use pigeon_watch::DirWatcher;
/// use std::time::{Duration, SystemTime};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let watcher = DirWatcher::with_poll_interval(".", Duration::from_secs(5))?;
/// watcher.set_purge_handler(|path| {
///     println!("stale: {}", path.display());
///     Ok(())
/// });
///
/// let controller = watcher.bootstrap(SystemTime::now())?;
/// std::thread::sleep(Duration::from_secs(30));
/// watcher.kill(&controller);
/// # Ok(())
/// # }
/// ```
pub struct DirWatcher {
    inner: Arc<WatcherInner>,
}

struct WatcherInner {
    root: PathBuf,
    config: WatcherConfig,
    classifier: RwLock<Classifier>,
    handlers: RwLock<HandlerPair>,
    metrics: Arc<Mutex<WatchMetrics>>,
    tasks: TaskRegistry,
}

impl DirWatcher {
    /// Create a watcher for `path`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::NotFound`] if `path` does not exist and
    /// [`WatchError::NotADirectory`] if it is not a directory.
    pub fn new<P: AsRef<Path>>(path: P, config: WatcherConfig) -> Result<Self, WatchError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(WatchError::NotFound(path.to_path_buf()));
        }
        if !path.is_dir() {
            return Err(WatchError::NotADirectory(path.to_path_buf()));
        }
        let root = path.canonicalize().map_err(|source| WatchError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!(
            "Watching {} (poll {:?}, depth {:?}, {} time)",
            root.display(),
            config.poll_interval(),
            config.max_depth,
            config.timestamp.as_str()
        );

        Ok(Self {
            inner: Arc::new(WatcherInner {
                root,
                classifier: RwLock::new(config.timestamp.classifier()),
                config,
                handlers: RwLock::new(HandlerPair::default()),
                metrics: Arc::new(Mutex::new(WatchMetrics::new())),
                tasks: TaskRegistry::new("dirwatch"),
            }),
        })
    }

    /// Create a watcher with the given poll interval and default configuration otherwise
    pub fn with_poll_interval<P: AsRef<Path>>(
        path: P,
        interval: Duration,
    ) -> Result<Self, WatchError> {
        Self::new(path, WatcherConfig::with_poll_interval(interval))
    }

    /// Absolute path of the watched directory
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Configuration given at construction
    pub fn config(&self) -> &WatcherConfig {
        &self.inner.config
    }

    /// Replace the handler applied to purgeable paths
    pub fn set_purge_handler<F>(&self, handler: F)
    where
        F: Fn(&Path) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.inner.handlers_mut().purge = Arc::new(handler);
    }

    /// Handler currently applied to purgeable paths
    pub fn purge_handler(&self) -> PathHandler {
        Arc::clone(&self.inner.handlers().purge)
    }

    /// Replace the handler applied to fresh paths
    pub fn set_retain_handler<F>(&self, handler: F)
    where
        F: Fn(&Path) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.inner.handlers_mut().retain = Arc::new(handler);
    }

    /// Handler currently applied to fresh paths
    pub fn retain_handler(&self) -> PathHandler {
        Arc::clone(&self.inner.handlers().retain)
    }

    /// Replace the timestamp reader used to classify files
    pub fn set_classifier<F>(&self, classifier: F)
    where
        F: Fn(&Path) -> std::io::Result<SystemTime> + Send + Sync + 'static,
    {
        *self
            .inner
            .classifier
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Arc::new(classifier);
    }

    /// Walk the tree and partition its files without dispatching any handler
    pub fn classify(
        &self,
        threshold: SystemTime,
        max_depth: Option<usize>,
    ) -> Result<Classification, WatchError> {
        classify_tree(&self.inner.root, threshold, max_depth, &self.inner.classifier())
    }

    /// Scan once and start one batch thread per non-empty partition.
    ///
    /// `max_depth` of `None` walks the whole tree; `Some(0)` only the root.
    /// Handles of started batches are returned; a partition with no files
    /// starts no thread and yields `None`.
    pub fn scan_once(
        &self,
        threshold: SystemTime,
        max_depth: Option<usize>,
    ) -> Result<ScanOutcome, WatchError> {
        self.inner.scan_once(threshold, max_depth)
    }

    /// Start the polling controller.
    ///
    /// The controller scans with `initial_threshold`, moves the threshold to
    /// the time the scan finished, sleeps for the poll interval and repeats
    /// until killed. Before exiting it waits for the batches it started.
    pub fn bootstrap(&self, initial_threshold: SystemTime) -> Result<TaskHandle, WatchError> {
        let inner = Arc::clone(&self.inner);
        let handle = self
            .inner
            .tasks
            .spawn("controller", move |token| inner.control_loop(initial_threshold, token))?;

        tracing::info!("Starting {} for {}", handle, self.inner.root.display());
        Ok(handle)
    }

    /// Signal a task and wait for it to stop.
    ///
    /// From inside a handler the task is only signalled, so a handler may
    /// stop its own controller.
    pub fn kill(&self, handle: &TaskHandle) -> KillOutcome {
        self.inner.tasks.kill(handle)
    }

    /// Signal and wait for every task of this watcher
    pub fn kill_all(&self) -> Vec<(TaskHandle, KillOutcome)> {
        self.inner.tasks.kill_all()
    }

    /// Wait for a batch (or the controller) to finish on its own
    pub fn join(&self, handle: &TaskHandle) -> KillOutcome {
        self.inner.tasks.join(handle)
    }

    /// Whether the task behind `handle` is still running
    pub fn is_alive(&self, handle: &TaskHandle) -> bool {
        self.inner.tasks.is_alive(handle)
    }

    /// Number of registered controller and batch tasks
    pub fn task_count(&self) -> usize {
        self.inner.tasks.len()
    }

    /// Snapshot of the collected metrics
    pub fn metrics(&self) -> WatchMetrics {
        self.inner.metrics_lock().clone()
    }

    /// Reset the collected metrics
    pub fn reset_metrics(&self) {
        self.inner.metrics_lock().reset();
    }
}

impl Drop for DirWatcher {
    fn drop(&mut self) {
        if !self.inner.tasks.is_empty() {
            self.inner.tasks.kill_all();
        }
    }
}

impl WatcherInner {
    fn scan_once(
        &self,
        threshold: SystemTime,
        max_depth: Option<usize>,
    ) -> Result<ScanOutcome, WatchError> {
        let started = Instant::now();
        let classification = classify_tree(&self.root, threshold, max_depth, &self.classifier())?;
        self.metrics_lock()
            .record_scan(&classification, started.elapsed());

        tracing::debug!(
            "Scanned {}: {} fresh, {} purgeable",
            self.root.display(),
            classification.fresh.len(),
            classification.purgeable.len()
        );

        let handlers = self.handlers().clone();
        let fresh_count = classification.fresh.len();
        let purgeable_count = classification.purgeable.len();

        let purgeable = self.dispatch(BatchKind::Purgeable, classification.purgeable, &handlers)?;
        let fresh = self.dispatch(BatchKind::Fresh, classification.fresh, &handlers)?;

        Ok(ScanOutcome {
            fresh,
            purgeable,
            fresh_count,
            purgeable_count,
        })
    }

    fn dispatch(
        &self,
        kind: BatchKind,
        paths: Vec<PathBuf>,
        handlers: &HandlerPair,
    ) -> Result<Option<TaskHandle>, WatchError> {
        if paths.is_empty() {
            return Ok(None);
        }

        let handler = Arc::clone(handlers.for_kind(kind));
        let metrics = Arc::clone(&self.metrics);
        // Batches run to completion; cancellation is only observed by the controller.
        let handle = self.tasks.spawn(kind.as_str(), move |_token| {
            run_batch(kind, &paths, &handler, &metrics);
        })?;

        Ok(Some(handle))
    }

    fn control_loop(&self, initial_threshold: SystemTime, token: CancellationToken) {
        let interval = self.config.poll_interval();
        let max_depth = self.config.max_depth;
        let mut threshold = initial_threshold;
        let mut in_flight: Vec<TaskHandle> = Vec::new();

        while !token.is_cancelled() {
            in_flight.retain(|handle| {
                if self.tasks.is_alive(handle) {
                    return true;
                }
                self.tasks.join(handle);
                false
            });

            match self.scan_once(threshold, max_depth) {
                Ok(outcome) => in_flight.extend(outcome.handles().cloned()),
                Err(e) => tracing::error!("Scan of {} failed: {}", self.root.display(), e),
            }
            threshold = SystemTime::now();

            tracing::debug!("Sleeping for {:?}", interval);
            token.wait_timeout(interval);
        }

        for handle in &in_flight {
            self.tasks.join(handle);
        }
        tracing::info!(
            "Controller for {} exiting. Final metrics:\n{}",
            self.root.display(),
            self.metrics_lock().summary()
        );
    }

    fn classifier(&self) -> Classifier {
        Arc::clone(
            &self
                .classifier
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }

    fn handlers(&self) -> std::sync::RwLockReadGuard<'_, HandlerPair> {
        self.handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn handlers_mut(&self) -> std::sync::RwLockWriteGuard<'_, HandlerPair> {
        self.handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn metrics_lock(&self) -> std::sync::MutexGuard<'_, WatchMetrics> {
        self.metrics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
