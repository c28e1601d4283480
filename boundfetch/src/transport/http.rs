//! `reqwest`-backed transports.
//!
//! Both transports share the same client setup (timeout, `Accept` and
//! `User-Agent` headers) and differ only in how the body is read.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, Response};
use tracing::{trace, warn};

use super::{BoxFuture, ResponseMetadata, Transport, TransportOutcome};
use crate::error::FetchError;

fn build_client(timeout: Duration, user_agent: &str) -> Option<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .default_headers(headers)
        .build()
        .map_err(|e| warn!(error = %e, "Failed to create HTTP client"))
        .ok()
}

/// Probe shared by the reqwest transports: the client exists and a Tokio
/// runtime is reachable to drive it.
fn reqwest_available(client: &Option<Client>) -> bool {
    client.is_some() && tokio::runtime::Handle::try_current().is_ok()
}

fn transport_error(url: &str, error: reqwest::Error) -> FetchError {
    let reason = if error.is_timeout() {
        format!("request timed out ({})", error)
    } else if error.is_connect() {
        format!("connection failed ({})", error)
    } else {
        error.to_string()
    };
    FetchError::Transport {
        url: url.to_string(),
        reason,
    }
}

fn client_missing(url: &str) -> TransportOutcome {
    TransportOutcome::failure(
        FetchError::Transport {
            url: url.to_string(),
            reason: "HTTP client unavailable".to_string(),
        },
        None,
    )
}

/// Sends the request and splits off the metadata.
///
/// Non-2xx responses are turned into a finished outcome here, so callers
/// only need to read the body of successful responses.
async fn send(
    client: &Client,
    url: &str,
) -> Result<(Response, ResponseMetadata), TransportOutcome> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| TransportOutcome::failure(transport_error(url, e), None))?;

    let metadata = ResponseMetadata::new(response.status().as_u16(), response.headers().clone());
    trace!(url, status = metadata.status, "Response received");

    if !metadata.is_success() {
        return Err(TransportOutcome::failure(
            FetchError::HttpStatus {
                status: metadata.status,
                url: url.to_string(),
            },
            Some(metadata),
        ));
    }

    Ok((response, metadata))
}

fn decode(url: &str, bytes: &[u8], metadata: ResponseMetadata) -> TransportOutcome {
    match serde_json::from_slice(bytes) {
        Ok(body) => TransportOutcome::success(body, metadata),
        Err(e) => TransportOutcome::failure(
            FetchError::Decode {
                url: url.to_string(),
                reason: e.to_string(),
            },
            Some(metadata),
        ),
    }
}

/// Transport that retrieves the whole body in a single call.
///
/// This is the preferred transport.
#[derive(Debug, Clone)]
pub struct FetchTransport {
    client: Option<Client>,
}

impl FetchTransport {
    /// Creates a fetch transport.
    ///
    /// If the HTTP client cannot be built the transport is still returned,
    /// but its probe reports it as unavailable.
    pub fn new(timeout: Duration, user_agent: &str) -> Self {
        Self {
            client: build_client(timeout, user_agent),
        }
    }
}

impl Transport for FetchTransport {
    fn name(&self) -> &str {
        "fetch"
    }

    fn probe(&self) -> bool {
        reqwest_available(&self.client)
    }

    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, TransportOutcome> {
        Box::pin(async move {
            let Some(client) = &self.client else {
                return client_missing(url);
            };
            let (response, metadata) = match send(client, url).await {
                Ok(parts) => parts,
                Err(outcome) => return outcome,
            };

            match response.bytes().await {
                Ok(bytes) => decode(url, &bytes, metadata),
                Err(e) => TransportOutcome::failure(transport_error(url, e), Some(metadata)),
            }
        })
    }
}

/// Transport that accumulates the body chunk by chunk before decoding.
#[derive(Debug, Clone)]
pub struct StreamTransport {
    client: Option<Client>,
}

impl StreamTransport {
    /// Creates a streaming transport.
    pub fn new(timeout: Duration, user_agent: &str) -> Self {
        Self {
            client: build_client(timeout, user_agent),
        }
    }
}

impl Transport for StreamTransport {
    fn name(&self) -> &str {
        "stream"
    }

    fn probe(&self) -> bool {
        reqwest_available(&self.client)
    }

    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, TransportOutcome> {
        Box::pin(async move {
            let Some(client) = &self.client else {
                return client_missing(url);
            };
            let (mut response, metadata) = match send(client, url).await {
                Ok(parts) => parts,
                Err(outcome) => return outcome,
            };

            let mut body = Vec::new();
            loop {
                match response.chunk().await {
                    Ok(Some(chunk)) => body.extend_from_slice(&chunk),
                    Ok(None) => break,
                    Err(e) => {
                        return TransportOutcome::failure(transport_error(url, e), Some(metadata))
                    }
                }
            }
            trace!(url, bytes = body.len(), "Body accumulated");

            decode(url, &body, metadata)
        })
    }
}
