//! Atomic counters for dispatcher activity.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use super::DispatcherSnapshot;

/// Counters describing everything a dispatcher has done.
#[derive(Debug, Default)]
pub struct DispatcherMetrics {
    submitted: AtomicU64,
    admitted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    peak_in_flight: AtomicUsize,
}

impl DispatcherMetrics {
    /// Creates zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a request entering the queue.
    pub fn request_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an admission. `in_flight` is the count including this request.
    pub fn request_admitted(&self, in_flight: usize) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
        self.peak_in_flight.fetch_max(in_flight, Ordering::Relaxed);
    }

    /// Records a completion with a body.
    pub fn request_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a completion with an error.
    pub fn request_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a point-in-time copy of the counters.
    pub fn snapshot(&self) -> DispatcherSnapshot {
        DispatcherSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            admitted: self.admitted.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            peak_in_flight: self.peak_in_flight.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metrics_are_zero() {
        let snapshot = DispatcherMetrics::new().snapshot();
        assert_eq!(snapshot, DispatcherSnapshot::default());
    }

    #[test]
    fn test_peak_only_grows() {
        let metrics = DispatcherMetrics::new();
        metrics.request_admitted(1);
        metrics.request_admitted(3);
        metrics.request_admitted(2);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.admitted, 3);
        assert_eq!(snapshot.peak_in_flight, 3);
    }

    #[test]
    fn test_outcome_counters() {
        let metrics = DispatcherMetrics::new();
        metrics.request_submitted();
        metrics.request_submitted();
        metrics.request_succeeded();
        metrics.request_failed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.submitted, 2);
        assert_eq!(snapshot.succeeded, 1);
        assert_eq!(snapshot.failed, 1);
    }
}
