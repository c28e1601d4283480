//! Request transport abstraction.
//!
//! A [`Transport`] performs one JSON GET and reports exactly one
//! [`TransportOutcome`]. Several implementations can exist side by side; the
//! [`TransportSelector`] picks the first one whose availability probe passes.
//!
//! # Contract
//!
//! Every conforming transport:
//!
//! - sends `Accept: application/json` and an identifying `User-Agent`
//! - on a 2xx status, decodes the body as JSON and returns it with metadata
//! - on any other status, returns [`FetchError::HttpStatus`] and no body
//! - on connection, DNS or timeout failure, returns [`FetchError::Transport`]
//! - on a body that is not JSON, returns [`FetchError::Decode`]
//!
//! ```text
//! TransportSelector ──probe()──► FetchTransport   (single-shot body)
//!                   ──probe()──► StreamTransport  (chunked body)
//! ```

mod http;
mod selector;

pub use http::{FetchTransport, StreamTransport};
pub use reqwest::header::HeaderMap;
pub use selector::{CandidateStatus, TransportSelector};

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CACHE_CONTROL;
use serde_json::Value;

use crate::error::FetchError;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Status line and headers of a response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseMetadata {
    /// HTTP status code.
    pub status: u16,
    /// Response headers (case-insensitive lookup).
    pub headers: HeaderMap,
}

impl ResponseMetadata {
    /// Creates metadata from a status and headers.
    pub fn new(status: u16, headers: HeaderMap) -> Self {
        Self { status, headers }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Looks up a header by name, ignoring case.
    ///
    /// Returns `None` if the header is absent or not valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the raw `cache-control` header value.
    pub fn cache_control(&self) -> Option<&str> {
        self.headers.get(CACHE_CONTROL).and_then(|v| v.to_str().ok())
    }
}

/// Result of a single transport call.
#[derive(Debug, Clone)]
pub struct TransportOutcome {
    /// Decoded JSON body, or the reason there is none.
    pub result: Result<Value, FetchError>,
    /// Response metadata, when a response was received at all.
    pub metadata: Option<ResponseMetadata>,
}

impl TransportOutcome {
    /// A successful response with a decoded body.
    pub fn success(body: Value, metadata: ResponseMetadata) -> Self {
        Self {
            result: Ok(body),
            metadata: Some(metadata),
        }
    }

    /// A failed request, with metadata if the server responded.
    pub fn failure(error: FetchError, metadata: Option<ResponseMetadata>) -> Self {
        Self {
            result: Err(error),
            metadata,
        }
    }
}

/// Capability to perform a JSON GET request.
///
/// Implementations must be cheap to probe and must produce exactly one
/// outcome per [`get`](Transport::get) call.
pub trait Transport: Send + Sync + 'static {
    /// Short name used in logs and configuration (e.g. `"fetch"`).
    fn name(&self) -> &str;

    /// Returns true if this transport can run in the current context.
    fn probe(&self) -> bool;

    /// Performs a GET request against `url`.
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, TransportOutcome>;
}

/// Built-in transport implementations, selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// [`FetchTransport`]: reads the whole body in one call.
    Fetch,
    /// [`StreamTransport`]: accumulates the body chunk by chunk.
    Stream,
}

impl TransportKind {
    /// Default priority order.
    pub const DEFAULT_ORDER: [TransportKind; 2] = [TransportKind::Fetch, TransportKind::Stream];

    /// Configuration name of this transport.
    pub fn name(&self) -> &'static str {
        match self {
            TransportKind::Fetch => "fetch",
            TransportKind::Stream => "stream",
        }
    }

    /// Builds the transport with the given request timeout and user agent.
    pub fn build(&self, timeout: Duration, user_agent: &str) -> Arc<dyn Transport> {
        match self {
            TransportKind::Fetch => Arc::new(FetchTransport::new(timeout, user_agent)),
            TransportKind::Stream => Arc::new(StreamTransport::new(timeout, user_agent)),
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown transport name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown transport '{0}' (expected one of: fetch, stream)")]
pub struct UnknownTransport(pub String);

impl FromStr for TransportKind {
    type Err = UnknownTransport;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fetch" => Ok(TransportKind::Fetch),
            "stream" => Ok(TransportKind::Stream),
            other => Err(UnknownTransport(other.to_string())),
        }
    }
}
