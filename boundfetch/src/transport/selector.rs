//! Transport selection by ordered availability probing.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error};

use super::{Transport, TransportKind};
use crate::error::DispatchError;

/// Probe result for one candidate transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateStatus {
    /// Transport name.
    pub name: String,
    /// Whether its probe passed.
    pub available: bool,
}

/// Picks the first available transport from a fixed priority list.
///
/// Selection is deterministic: given the same candidates and the same
/// runtime context, [`resolve`](Self::resolve) returns the same transport.
#[derive(Clone, Default)]
pub struct TransportSelector {
    candidates: Vec<Arc<dyn Transport>>,
}

impl TransportSelector {
    /// Creates a selector over candidates in priority order.
    pub fn new(candidates: Vec<Arc<dyn Transport>>) -> Self {
        Self { candidates }
    }

    /// Creates a selector from built-in transport kinds.
    pub fn from_kinds(kinds: &[TransportKind], timeout: Duration, user_agent: &str) -> Self {
        Self::new(
            kinds
                .iter()
                .map(|kind| kind.build(timeout, user_agent))
                .collect(),
        )
    }

    /// Appends a lower-priority candidate.
    pub fn with_candidate(mut self, transport: Arc<dyn Transport>) -> Self {
        self.candidates.push(transport);
        self
    }

    /// Returns the first candidate whose probe succeeds.
    ///
    /// # Errors
    ///
    /// [`DispatchError::NoTransport`] if no candidate is available. This is a
    /// configuration failure, not a per-request one.
    pub fn resolve(&self) -> Result<Arc<dyn Transport>, DispatchError> {
        for candidate in &self.candidates {
            if candidate.probe() {
                debug!(transport = candidate.name(), "Transport selected");
                return Ok(Arc::clone(candidate));
            }
            debug!(transport = candidate.name(), "Transport unavailable");
        }

        let tried: Vec<String> = self
            .candidates
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        error!(tried = ?tried, "No request transport available");
        Err(DispatchError::NoTransport { tried })
    }

    /// Probes every candidate and reports the results in priority order.
    pub fn describe(&self) -> Vec<CandidateStatus> {
        self.candidates
            .iter()
            .map(|c| CandidateStatus {
                name: c.name().to_string(),
                available: c.probe(),
            })
            .collect()
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Returns true if there are no candidates at all.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl fmt::Debug for TransportSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportSelector")
            .field(
                "candidates",
                &self.candidates.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
