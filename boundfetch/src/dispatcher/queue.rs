//! FIFO queue of requests waiting for admission.
//!
//! Requests leave the queue strictly in the order they entered it. Each one
//! is stamped with a per-queue sequence number and its enqueue time so that
//! admission order and queue wait can be logged.

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use super::ResponseOutcome;

/// Completion invoked exactly once with the request's outcome.
pub type Completion = Box<dyn FnOnce(ResponseOutcome) + Send + 'static>;

// =============================================================================
// Queued Request
// =============================================================================

/// A request waiting to be executed.
pub struct QueuedRequest {
    /// The URL to fetch.
    pub url: String,

    /// Caller's completion.
    completion: Completion,

    /// Position in submission order.
    sequence: u64,

    /// When the request was enqueued.
    pub enqueued_at: Instant,
}

impl QueuedRequest {
    fn new(url: String, completion: Completion, sequence: u64) -> Self {
        Self {
            url,
            completion,
            sequence,
            enqueued_at: Instant::now(),
        }
    }

    /// Returns the submission sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns how long this request has been waiting.
    pub fn wait_time(&self) -> Duration {
        self.enqueued_at.elapsed()
    }

    /// Consumes the request and hands the outcome to its completion.
    pub fn complete(self, outcome: ResponseOutcome) {
        (self.completion)(outcome);
    }
}

impl fmt::Debug for QueuedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedRequest")
            .field("url", &self.url)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Pending Queue
// =============================================================================

/// Unbounded FIFO of pending requests.
///
/// Not thread-safe on its own; the dispatcher keeps it behind its state lock.
#[derive(Debug, Default)]
pub struct PendingQueue {
    items: VecDeque<QueuedRequest>,
    next_sequence: u64,
}

impl PendingQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a request and returns its sequence number.
    pub fn push(&mut self, url: String, completion: Completion) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.items
            .push_back(QueuedRequest::new(url, completion, sequence));
        sequence
    }

    /// Removes the oldest request.
    pub fn pop(&mut self) -> Option<QueuedRequest> {
        self.items.pop_front()
    }

    /// Removes every request, oldest first.
    pub fn drain(&mut self) -> Vec<QueuedRequest> {
        self.items.drain(..).collect()
    }

    /// Number of waiting requests.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
