//! Job runner: synchronous and fire-and-forget execution

use crate::retry::execute;
use crate::{Job, JobMetrics, JobResult, JobRunnerConfig, JobRunnerError, RetryPolicy};
use pigeon_task::{panic_message, CancellationToken, KillOutcome, TaskHandle, TaskRegistry};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

/// Runs jobs under their locks, retrying while the lock is contended.
///
/// [`run`](Self::run) executes on the calling thread and returns the final
/// result. [`spawn`](Self::spawn) starts a worker thread, returns at once and
/// hands the final result to a callback on that thread.
/// [`close`](Self::close) waits for every spawned worker.
///
/// # Examples
///
/// ```
/// use pigeon_jobs::{Job, JobRunner, MutexLock};
/// use std::sync::mpsc;
///
/// let runner = JobRunner::default();
/// let lock = MutexLock::shared();
///
/// let result = runner.run(Job::infallible("sync", || 40 + 2).with_lock(lock.clone()));
/// assert_eq!(result.ok(), Some(42));
///
/// let (tx, rx) = mpsc::channel();
/// runner
///     .spawn(Job::infallible("async", || "done").with_lock(lock), move |result| {
///         tx.send(result.ok()).unwrap();
///     })
///     .unwrap();
///
/// assert_eq!(runner.close(), 1);
/// assert_eq!(rx.recv().unwrap(), Some("done"));
/// ```
pub struct JobRunner {
    policy: RetryPolicy,
    metrics: Arc<Mutex<JobMetrics>>,
    tasks: TaskRegistry,
}

impl JobRunner {
    /// Create a runner from configuration
    pub fn new(config: JobRunnerConfig) -> Self {
        Self::with_policy(config.retry_policy())
    }

    /// Create a runner with an explicit retry policy
    pub fn with_policy(policy: RetryPolicy) -> Self {
        tracing::debug!(
            "Job runner retrying every {:?} (max attempts {:?}, exponential {})",
            policy.backoff,
            policy.max_attempts,
            policy.exponential
        );

        Self {
            policy,
            metrics: Arc::new(Mutex::new(JobMetrics::new())),
            tasks: TaskRegistry::new("jobs"),
        }
    }

    /// Retry policy applied to every job
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `job` on the calling thread and return its final result.
    ///
    /// Blocks while the job's lock is contended, for as long as the retry
    /// policy allows.
    pub fn run<T>(&self, job: Job<T>) -> JobResult<T> {
        tracing::debug!("Running job '{}'", job.name());
        execute(job, &self.policy, &self.metrics, &CancellationToken::new())
    }

    /// Run `job` on a new worker thread and deliver its final result to
    /// `callback` on that thread.
    ///
    /// Returns as soon as the worker is started. A panicking callback is
    /// logged and contained. Killing the returned handle stops retries; the
    /// callback then receives [`RetryReason::Cancelled`](crate::RetryReason::Cancelled).
    pub fn spawn<T, C>(&self, job: Job<T>, callback: C) -> Result<TaskHandle, JobRunnerError>
    where
        T: 'static,
        C: FnOnce(JobResult<T>) + Send + 'static,
    {
        self.tasks.reap_finished();

        let policy = self.policy.clone();
        let metrics = Arc::clone(&self.metrics);
        let name = job.name().to_string();
        let handle = self.tasks.spawn(&name.clone(), move |token| {
            let result = execute(job, &policy, &metrics, &token);
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback(result))) {
                tracing::warn!(
                    "Callback for job '{}' panicked: {}",
                    name,
                    panic_message(payload.as_ref())
                );
            }
        })?;

        tracing::debug!("Spawned {}", handle);
        Ok(handle)
    }

    /// Cancel a spawned job's retries and wait for its worker
    pub fn kill(&self, handle: &TaskHandle) -> KillOutcome {
        self.tasks.kill(handle)
    }

    /// Wait for every spawned worker, in spawn order.
    ///
    /// Returns the number of workers joined.
    pub fn close(&self) -> usize {
        let joined = self.tasks.join_all();
        tracing::info!("Job runner closed, joined {} worker(s)", joined);
        joined
    }

    /// Spawned workers not yet joined
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Snapshot of the collected metrics
    pub fn metrics(&self) -> JobMetrics {
        self.metrics_lock().clone()
    }

    /// Reset the collected metrics
    pub fn reset_metrics(&self) {
        self.metrics_lock().reset();
    }

    fn metrics_lock(&self) -> std::sync::MutexGuard<'_, JobMetrics> {
        self.metrics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new(JobRunnerConfig::default())
    }
}

impl Drop for JobRunner {
    fn drop(&mut self) {
        if !self.tasks.is_empty() {
            self.tasks.kill_all();
        }
    }
}

impl fmt::Debug for JobRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRunner")
            .field("policy", &self.policy)
            .field("pending", &self.tasks.len())
            .finish()
    }
}
