//! Outcome handed to a request's completion.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::FetchError;
use crate::transport::{ResponseMetadata, TransportOutcome};
use crate::ttl::extract_ttl;

/// Everything known about a finished request.
///
/// Exactly one of body or error is present. `ttl` is only derived for
/// successful responses.
#[derive(Debug, Clone)]
pub struct ResponseOutcome {
    /// The requested URL.
    pub url: String,
    /// Decoded JSON body, or the error that prevented one.
    pub result: Result<Value, FetchError>,
    /// Status and headers, if a response was received.
    pub metadata: Option<ResponseMetadata>,
    /// Freshness lifetime in seconds from `cache-control: max-age`.
    pub ttl: Option<u64>,
}

impl ResponseOutcome {
    /// Builds the outcome for a finished transport call.
    pub fn from_transport(url: String, outcome: TransportOutcome) -> Self {
        let TransportOutcome { result, metadata } = outcome;
        let ttl = match (&result, &metadata) {
            (Ok(_), Some(metadata)) => extract_ttl(&metadata.headers),
            _ => None,
        };
        Self {
            url,
            result,
            metadata,
            ttl,
        }
    }

    /// Builds an outcome for a request that never reached a transport.
    pub fn failed(url: String, error: FetchError) -> Self {
        Self {
            url,
            result: Err(error),
            metadata: None,
            ttl: None,
        }
    }

    /// Returns true if a body was decoded.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Returns the error, if any.
    pub fn error(&self) -> Option<&FetchError> {
        self.result.as_ref().err()
    }

    /// Returns the decoded body, if any.
    pub fn body(&self) -> Option<&Value> {
        self.result.as_ref().ok()
    }

    /// Returns the HTTP status, if a response was received.
    pub fn status(&self) -> Option<u16> {
        self.metadata.as_ref().map(|m| m.status)
    }

    /// Deserializes the body into `T`.
    ///
    /// # Errors
    ///
    /// The request's own error, or [`FetchError::Decode`] if the body does
    /// not match `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, FetchError> {
        let url = self.url;
        let body = self.result?;
        serde_json::from_value(body).map_err(|e| FetchError::Decode {
            url,
            reason: e.to_string(),
        })
    }

    /// Splits into `(error, body, metadata, ttl)`.
    pub fn into_parts(
        self,
    ) -> (
        Option<FetchError>,
        Option<Value>,
        Option<ResponseMetadata>,
        Option<u64>,
    ) {
        let (error, body) = match self.result {
            Ok(body) => (None, Some(body)),
            Err(error) => (Some(error), None),
        };
        (error, body, self.metadata, self.ttl)
    }
}
