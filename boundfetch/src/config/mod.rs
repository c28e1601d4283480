//! Dispatcher configuration.
//!
//! [`DispatcherConfig`] is the in-memory configuration used to build a
//! [`Dispatcher`](crate::Dispatcher). [`ConfigFile`] loads it, together with
//! logging settings, from an INI file.
//!
//! # Example
//!
//! ```
//! use boundfetch::config::DispatcherConfig;
//! use std::time::Duration;
//!
//! let config = DispatcherConfig::default()
//!     .with_max_concurrency(4)
//!     .with_timeout(Duration::from_secs(10));
//! assert_eq!(config.max_concurrency, 4);
//! ```

mod file;

pub use file::{ConfigError, ConfigFile};

use std::time::Duration;

use crate::transport::{TransportKind, TransportSelector};

/// Default maximum number of simultaneous requests.
pub const DEFAULT_MAX_CONCURRENCY: usize = 20;

/// Default per-request timeout applied by the built-in transports.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Configuration for a [`Dispatcher`](crate::Dispatcher).
#[derive(Clone, Debug, PartialEq)]
pub struct DispatcherConfig {
    /// Maximum requests in flight at once. Fixed for the dispatcher's lifetime.
    pub max_concurrency: usize,

    /// Re-run transport selection on every admission instead of once.
    pub reprobe: bool,

    /// Built-in transport settings.
    pub transport: TransportConfig,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            reprobe: false,
            transport: TransportConfig::default(),
        }
    }
}

impl DispatcherConfig {
    /// Set the concurrency cap.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Enable or disable per-admission transport selection.
    pub fn with_reprobe(mut self, reprobe: bool) -> Self {
        self.reprobe = reprobe;
        self
    }

    /// Set the request timeout of the built-in transports.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.transport.timeout = timeout;
        self
    }

    /// Set the `User-Agent` sent by the built-in transports.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.transport.user_agent = user_agent.into();
        self
    }

    /// Set the transport priority order.
    pub fn with_transport_order(mut self, order: Vec<TransportKind>) -> Self {
        self.transport.order = order;
        self
    }
}

/// Settings for the built-in `reqwest` transports.
#[derive(Clone, Debug, PartialEq)]
pub struct TransportConfig {
    /// Candidates in priority order.
    pub order: Vec<TransportKind>,

    /// Per-request timeout.
    pub timeout: Duration,

    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            order: TransportKind::DEFAULT_ORDER.to_vec(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: crate::user_agent(),
        }
    }
}

impl TransportConfig {
    /// Builds a selector over the configured transports.
    pub fn build_selector(&self) -> TransportSelector {
        TransportSelector::from_kinds(&self.order, self.timeout, &self.user_agent)
    }
}
