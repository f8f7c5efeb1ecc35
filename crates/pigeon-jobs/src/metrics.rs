//! Metrics collection for job execution

use crate::JobResult;

/// Counters collected across jobs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobMetrics {
    /// Jobs that ran and succeeded
    pub succeeded: usize,

    /// Jobs that ran and failed or panicked
    pub failed: usize,

    /// Attempts that found the lock held
    pub contended: usize,

    /// Jobs that never ran (retry cap reached or cancelled)
    pub gave_up: usize,
}

impl JobMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one attempt that found the lock held
    pub fn record_contention(&mut self) {
        self.contended += 1;
    }

    /// Record the final result of a job
    pub fn record_result<T>(&mut self, result: &JobResult<T>) {
        match result {
            JobResult::Success(_) => self.succeeded += 1,
            JobResult::Failed(_) => self.failed += 1,
            JobResult::Retryable(_) => self.gave_up += 1,
        }
    }

    /// Jobs that reached a final result
    pub fn completed(&self) -> usize {
        self.succeeded + self.failed + self.gave_up
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        [
            "Job Metrics Summary".to_string(),
            "===================".to_string(),
            format!("Completed: {}", self.completed()),
            format!("Succeeded: {}", self.succeeded),
            format!("Failed: {}", self.failed),
            format!("Gave up: {}", self.gave_up),
            format!("Lock contention: {}", self.contended),
        ]
        .join("\n")
    }
}
