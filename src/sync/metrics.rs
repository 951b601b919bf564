//! # Poll Metrics
//!
//! Counters for the poll cycles of one conversation.

use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PollMetrics {
    /// Poll cycles that reached the store, scheduled or manual
    pub ticks: u64,
    pub successful_merges: u64,
    /// Merges that changed the displayed sequence
    pub changes_emitted: u64,
    pub failures: u64,
    pub last_duration: Option<Duration>,
}

impl PollMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, duration: Duration, changed: bool) {
        self.ticks += 1;
        self.successful_merges += 1;
        if changed {
            self.changes_emitted += 1;
        }
        self.last_duration = Some(duration);
    }

    pub fn record_failure(&mut self, duration: Duration) {
        self.ticks += 1;
        self.failures += 1;
        self.last_duration = Some(duration);
    }

    pub fn success_rate(&self) -> f64 {
        if self.ticks == 0 {
            0.0
        } else {
            self.successful_merges as f64 / self.ticks as f64
        }
    }
}
