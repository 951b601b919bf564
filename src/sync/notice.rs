//! # Failure Notice
//!
//! Rate limits the reporting of background poll failures. The first failure
//! of a streak is reported; further failures are reported again only once
//! `interval` has elapsed since the last report. The latest error stays
//! available for display until a poll succeeds.

use std::time::Duration;
use tokio::time::Instant;

use crate::shared::error::SyncError;

#[derive(Debug, Clone)]
pub struct FailureNotice {
    interval: Duration,
    streak: u32,
    last_reported: Option<Instant>,
    current: Option<SyncError>,
}

impl FailureNotice {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            streak: 0,
            last_reported: None,
            current: None,
        }
    }

    /// Record a failed poll. Returns true if it should be reported.
    pub fn record_failure(&mut self, error: SyncError, now: Instant) -> bool {
        self.streak += 1;
        self.current = Some(error);

        let due = match self.last_reported {
            None => true,
            Some(at) => now.saturating_duration_since(at) >= self.interval,
        };
        if due {
            self.last_reported = Some(now);
        }
        due
    }

    /// Record a successful poll. Returns the length of the streak it ended, if any.
    pub fn record_success(&mut self) -> Option<u32> {
        self.current = None;
        self.last_reported = None;
        match std::mem::take(&mut self.streak) {
            0 => None,
            streak => Some(streak),
        }
    }

    /// Error of the ongoing failure streak
    pub fn current(&self) -> Option<&SyncError> {
        self.current.as_ref()
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }
}
