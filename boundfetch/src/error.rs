//! Error types for dispatching and fetching.
//!
//! Two classes of failure exist:
//!
//! - [`DispatchError`]: configuration-class failures. These are returned from
//!   constructors and from [`Dispatcher::submit`](crate::Dispatcher::submit)
//!   and mean no request can make progress.
//! - [`FetchError`]: per-request failures. These are only ever delivered
//!   through the request's own completion and never affect other requests.

use thiserror::Error;

/// Errors that stop the dispatcher as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The concurrency cap was zero or negative.
    #[error("max_concurrency must be at least 1 (got {0})")]
    InvalidConcurrency(i64),

    /// Every candidate transport failed its availability probe.
    #[error("No request transport available (tried: {})", .tried.join(", "))]
    NoTransport {
        /// Names of the candidates that were probed, in priority order.
        tried: Vec<String>,
    },

    /// No Tokio runtime is reachable from the submitting context.
    #[error("No Tokio runtime available to drive requests")]
    NoRuntime,

    /// A previous fatal error stopped the dispatcher.
    #[error("Dispatcher halted: {0}")]
    Halted(String),
}

/// Errors delivered to a single request's completion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The server answered with a non-2xx status.
    #[error("Unexpected status code [{status}] on URL {url}")]
    HttpStatus { status: u16, url: String },

    /// Connection, DNS, timeout or body transfer failure.
    #[error("Unexpected error on URL {url}: {reason}")]
    Transport { url: String, reason: String },

    /// The body of a successful response was not valid JSON, or did not
    /// match the requested type.
    #[error("Failed to decode JSON from {url}: {reason}")]
    Decode { url: String, reason: String },

    /// The request was never executed because the dispatcher halted.
    #[error("Request not executed: {0}")]
    Configuration(String),
}

impl FetchError {
    /// Returns the HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the URL the error refers to, if known.
    pub fn url(&self) -> Option<&str> {
        match self {
            FetchError::HttpStatus { url, .. }
            | FetchError::Transport { url, .. }
            | FetchError::Decode { url, .. } => Some(url),
            FetchError::Configuration(_) => None,
        }
    }
}
