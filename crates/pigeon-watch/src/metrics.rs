//! Metrics collection for watcher scans

use crate::{BatchKind, Classification};
use std::time::Duration;

/// Counters collected across scans and batches
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchMetrics {
    /// Scans completed
    pub scan_count: usize,

    /// Files classified fresh, summed over scans
    pub fresh_seen: usize,

    /// Files classified purgeable, summed over scans
    pub purgeable_seen: usize,

    /// Entries skipped because they could not be read
    pub unreadable: usize,

    /// Fresh paths whose retain handler succeeded
    pub retained: usize,

    /// Purgeable paths whose purge handler succeeded
    pub purged: usize,

    /// Handler calls that returned an error or panicked
    pub handler_failures: usize,

    /// Time spent walking trees
    pub total_scan_time: Duration,
}

impl WatchMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed scan
    pub fn record_scan(&mut self, classification: &Classification, elapsed: Duration) {
        self.scan_count += 1;
        self.fresh_seen += classification.fresh.len();
        self.purgeable_seen += classification.purgeable.len();
        self.unreadable += classification.unreadable;
        self.total_scan_time += elapsed;
    }

    /// Record a successful handler call
    pub fn record_handled(&mut self, kind: BatchKind) {
        match kind {
            BatchKind::Fresh => self.retained += 1,
            BatchKind::Purgeable => self.purged += 1,
        }
    }

    /// Record a failed handler call
    pub fn record_failure(&mut self) {
        self.handler_failures += 1;
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        [
            "Watcher Metrics Summary".to_string(),
            "=======================".to_string(),
            format!("Scans: {}", self.scan_count),
            format!("Total scan time: {}ms", self.total_scan_time.as_millis()),
            format!("Fresh seen: {}", self.fresh_seen),
            format!("Purgeable seen: {}", self.purgeable_seen),
            format!("Unreadable: {}", self.unreadable),
            format!("Retained: {}", self.retained),
            format!("Purged: {}", self.purged),
            format!("Handler failures: {}", self.handler_failures),
        ]
        .join("\n")
    }
}
