//! Point-in-time view of dispatcher counters.

use std::fmt;

/// Copy of [`DispatcherMetrics`](super::DispatcherMetrics) at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherSnapshot {
    /// Requests accepted into the queue.
    pub submitted: u64,
    /// Requests moved from the queue to in flight.
    pub admitted: u64,
    /// Completions that carried a body.
    pub succeeded: u64,
    /// Completions that carried an error.
    pub failed: u64,
    /// Highest in-flight count observed.
    pub peak_in_flight: usize,
}

impl DispatcherSnapshot {
    /// Requests whose completion has fired.
    pub fn completed(&self) -> u64 {
        self.succeeded + self.failed
    }

    /// Requests submitted but not yet admitted.
    pub fn waiting(&self) -> u64 {
        self.submitted.saturating_sub(self.admitted)
    }
}

impl fmt::Display for DispatcherSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} submitted, {} succeeded, {} failed, peak {} in flight",
            self.submitted, self.succeeded, self.failed, self.peak_in_flight
        )
    }
}
