//! Dispatcher telemetry.
//!
//! Lock-free atomic counters updated by the dispatcher, with point-in-time
//! snapshots for display.
//!
//! ```text
//! Dispatcher ─────► DispatcherMetrics ─────► DispatcherSnapshot ─────► Views
//!                   (atomic counters)        (point-in-time copy)      (CLI, logs)
//! ```
//!
//! # Example
//!
//! ```
//! use boundfetch::telemetry::DispatcherMetrics;
//!
//! let metrics = DispatcherMetrics::new();
//! metrics.request_submitted();
//! metrics.request_admitted(1);
//! metrics.request_succeeded();
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.completed(), 1);
//! assert_eq!(snapshot.peak_in_flight, 1);
//! ```

mod metrics;
mod snapshot;

pub use metrics::DispatcherMetrics;
pub use snapshot::DispatcherSnapshot;
