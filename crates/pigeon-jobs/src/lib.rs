//! Pigeon Jobs
//!
//! Lock-guarded job execution with retry on contention.
//!
//! # Overview
//!
//! A [`Job`] is a named closure plus an optional [`JobLock`]. Running it takes
//! two layers:
//!
//! 1. **Guard**: try the lock without waiting. If it is free the closure runs
//!    and the lock is released on every exit path, panics included. If it is
//!    held the closure does not run and the attempt is
//!    [`JobResult::Retryable`].
//! 2. **Retry**: a retryable attempt sleeps for the [`RetryPolicy`] backoff
//!    and tries again. The default policy retries forever every 200 ms.
//!
//! Two jobs sharing one lock never run their bodies at the same time. Jobs
//! with different locks, or none, run fully concurrently.
//!
//! Errors returned by a job and panics inside it are captured into
//! [`JobResult::Failed`]; nothing is re-raised to the caller.
//!
//! # Usage
//!
//! ```
//! use pigeon_jobs::{Job, JobRunner, MutexLock};
//! use std::sync::atomic::{AtomicI64, Ordering};
//! use std::sync::Arc;
//!
//! let runner = JobRunner::default();
//! let lock = MutexLock::shared();
//! let counter = Arc::new(AtomicI64::new(0));
//!
//! let c = Arc::clone(&counter);
//! let job = Job::infallible("increment", move || c.fetch_add(2, Ordering::SeqCst) + 2)
//!     .with_lock(lock.clone());
//!
//! runner
//!     .spawn(job, |result| println!("counter is now {:?}", result.ok()))
//!     .unwrap();
//! runner.close();
//!
//! assert_eq!(counter.load(Ordering::SeqCst), 2);
//! ```
//!
//! # Configuration
//!
//! ```toml
//! retry_backoff_ms = 200
//! max_attempts = 10          # omit to retry forever
//! exponential_backoff = true
//! max_backoff_ms = 5000
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod job;
mod lock;
mod metrics;
mod retry;
mod runner;

pub use config::JobRunnerConfig;
pub use error::{JobError, JobRunnerError};
pub use job::{Job, JobResult, RetryReason};
pub use lock::{JobLock, LockGuard, MutexLock, NoopLock, SharedLock};
pub use metrics::JobMetrics;
pub use retry::{RetryPolicy, DEFAULT_BACKOFF};
pub use runner::JobRunner;

pub use pigeon_task::{BoxError, KillOutcome, TaskHandle};
