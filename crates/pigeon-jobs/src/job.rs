//! Jobs and their tri-state results

use crate::lock::{JobLock, LockGuard, NoopLock, SharedLock};
use crate::JobError;
use pigeon_task::{panic_message, BoxError};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Why a job did not run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    /// The job's lock was held elsewhere on every attempt
    LockBusy {
        /// Attempts made before giving up
        attempts: u32,
    },
    /// The job was cancelled while waiting to retry
    Cancelled {
        /// Attempts made before cancellation
        attempts: u32,
    },
}

impl fmt::Display for RetryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryReason::LockBusy { attempts } => {
                write!(f, "could not acquire lock after {} attempt(s)", attempts)
            }
            RetryReason::Cancelled { attempts } => {
                write!(f, "cancelled after {} attempt(s)", attempts)
            }
        }
    }
}

/// Outcome of running a job
#[derive(Debug)]
pub enum JobResult<T> {
    /// The job ran and returned a value
    Success(T),
    /// The job did not run because its lock was busy
    Retryable(RetryReason),
    /// The job ran and failed
    Failed(JobError),
}

impl<T> JobResult<T> {
    /// Whether the job ran successfully
    pub fn is_success(&self) -> bool {
        matches!(self, JobResult::Success(_))
    }

    /// Whether the job did not get to run
    pub fn is_retryable(&self) -> bool {
        matches!(self, JobResult::Retryable(_))
    }

    /// Whether the job ran and failed
    pub fn is_failed(&self) -> bool {
        matches!(self, JobResult::Failed(_))
    }

    /// The success payload, if any
    pub fn ok(self) -> Option<T> {
        match self {
            JobResult::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            JobResult::Success(_) => "success",
            JobResult::Retryable(_) => "retryable",
            JobResult::Failed(_) => "failed",
        }
    }
}

type JobFn<T> = Box<dyn FnOnce() -> Result<T, BoxError> + Send>;

/// A named unit of work with an optional lock.
///
/// Arguments are captured by the closure.
///
/// # Examples
///
/// ```
/// use pigeon_jobs::{Job, MutexLock};
///
/// let lock = MutexLock::shared();
/// let job = Job::infallible("add", || 2 + 2).with_lock(lock);
///
/// assert_eq!(job.try_once().ok(), Some(4));
/// ```
pub struct Job<T> {
    name: String,
    lock: Option<SharedLock>,
    func: Option<JobFn<T>>,
}

impl<T> Job<T> {
    /// Create a job from a fallible closure
    pub fn new<F, E>(name: impl Into<String>, func: F) -> Self
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: Into<BoxError>,
    {
        Self {
            name: name.into(),
            lock: None,
            func: Some(Box::new(move || func().map_err(Into::into))),
        }
    }

    /// Create a job from a closure that cannot fail
    pub fn infallible<F>(name: impl Into<String>, func: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        Self {
            name: name.into(),
            lock: None,
            func: Some(Box::new(move || Ok(func()))),
        }
    }

    /// Guard the job body with `lock`
    pub fn with_lock(mut self, lock: SharedLock) -> Self {
        self.lock = Some(lock);
        self
    }

    /// Job name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lock guarding the body, if any
    pub fn lock(&self) -> Option<&SharedLock> {
        self.lock.as_ref()
    }

    /// Make a single guarded attempt.
    ///
    /// Returns [`JobResult::Retryable`] without running the body if the lock
    /// is held elsewhere.
    pub fn try_once(mut self) -> JobResult<T> {
        self.attempt(1)
    }

    /// One try-lock attempt; the body runs at most once over the job's life.
    pub(crate) fn attempt(&mut self, attempt: u32) -> JobResult<T> {
        let lock: &dyn JobLock = match &self.lock {
            Some(lock) => lock.as_ref(),
            None => &NoopLock,
        };

        let Some(_guard) = LockGuard::try_acquire(lock) else {
            tracing::debug!("Could not acquire lock for job '{}'", self.name);
            return JobResult::Retryable(RetryReason::LockBusy { attempts: attempt });
        };

        let Some(func) = self.func.take() else {
            return JobResult::Failed(JobError::AlreadyRun(self.name.clone()));
        };

        match panic::catch_unwind(AssertUnwindSafe(func)) {
            Ok(Ok(value)) => JobResult::Success(value),
            Ok(Err(e)) => {
                tracing::warn!("Job '{}' failed: {}", self.name, e);
                JobResult::Failed(JobError::Failed(e))
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::warn!("Job '{}' panicked: {}", self.name, message);
                JobResult::Failed(JobError::Panicked(message))
            }
        }
    }
}

impl<T> fmt::Debug for Job<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("locked", &self.lock.is_some())
            .field("consumed", &self.func.is_none())
            .finish()
    }
}
