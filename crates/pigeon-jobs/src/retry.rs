//! Retry-on-contention loop

use crate::{Job, JobMetrics, JobResult, RetryReason};
use pigeon_task::CancellationToken;
use std::sync::Mutex;
use std::time::Duration;

/// Backoff used when none is configured
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(200);

/// How contended jobs are retried.
///
/// The default retries forever with a fixed 200 ms pause and no jitter. Under
/// sustained contention a job therefore never returns; set `max_attempts`
/// to bound it.
///
/// # Examples
///
/// ```
/// use pigeon_jobs::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::default()
///     .with_max_attempts(5)
///     .with_exponential(Duration::from_secs(1));
///
/// assert_eq!(policy.delay_for(1), Duration::from_millis(200));
/// assert_eq!(policy.delay_for(2), Duration::from_millis(400));
/// assert_eq!(policy.delay_for(4), Duration::from_secs(1));
/// assert!(policy.allows_retry(4));
/// assert!(!policy.allows_retry(5));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Pause after the first contended attempt
    pub backoff: Duration,
    /// Total attempts before giving up; `None` retries forever
    pub max_attempts: Option<u32>,
    /// Double the pause after every contended attempt
    pub exponential: bool,
    /// Upper bound for exponential pauses
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: DEFAULT_BACKOFF,
            max_attempts: None,
            exponential: false,
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Retry forever with a fixed pause
    pub fn fixed(backoff: Duration) -> Self {
        Self {
            backoff,
            ..Default::default()
        }
    }

    /// Give up after `attempts` tries (at least one is always made)
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Grow the pause exponentially up to `max_backoff`
    pub fn with_exponential(mut self, max_backoff: Duration) -> Self {
        self.exponential = true;
        self.max_backoff = max_backoff;
        self
    }

    /// Whether another attempt may follow attempt number `attempt` (1-based)
    pub fn allows_retry(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt < max)
    }

    /// Pause after contended attempt number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if !self.exponential {
            return self.backoff;
        }
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.backoff
            .checked_mul(factor)
            .map_or(self.max_backoff, |delay| delay.min(self.max_backoff))
    }
}

/// Attempt `job` until it runs, the policy gives up or `token` is cancelled.
pub(crate) fn execute<T>(
    mut job: Job<T>,
    policy: &RetryPolicy,
    metrics: &Mutex<JobMetrics>,
    token: &CancellationToken,
) -> JobResult<T> {
    let mut attempt = 1;

    let result = loop {
        match job.attempt(attempt) {
            JobResult::Retryable(reason) => {
                lock_metrics(metrics).record_contention();

                if !policy.allows_retry(attempt) {
                    tracing::warn!("Giving up on job '{}': {}", job.name(), reason);
                    break JobResult::Retryable(reason);
                }

                let delay = policy.delay_for(attempt);
                tracing::debug!("Retrying job '{}' after {:?}", job.name(), delay);
                if token.wait_timeout(delay) {
                    tracing::info!("Job '{}' cancelled while waiting for its lock", job.name());
                    break JobResult::Retryable(RetryReason::Cancelled { attempts: attempt });
                }
                attempt = attempt.saturating_add(1);
            }
            done => break done,
        }
    };

    lock_metrics(metrics).record_result(&result);
    result
}

fn lock_metrics(metrics: &Mutex<JobMetrics>) -> std::sync::MutexGuard<'_, JobMetrics> {
    metrics
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
