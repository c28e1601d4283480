//! boundfetch - bounded-concurrency JSON GET dispatching.
//!
//! A [`Dispatcher`] queues HTTP GET requests in FIFO order and keeps at most
//! `max_concurrency` of them in flight. Requests run over the first
//! [`Transport`](transport::Transport) whose availability probe passes, and
//! every request's completion receives a [`ResponseOutcome`] carrying the
//! decoded JSON body (or an error), the response metadata and the cache
//! lifetime from `cache-control: max-age`.
//!
//! # Example
//!
//! ```no_run
//! use boundfetch::{Dispatcher, DispatcherConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = Dispatcher::from_config(&DispatcherConfig::default().with_max_concurrency(4))?;
//!
//!     let outcome = dispatcher.fetch("https://example.com/api").await?;
//!     match outcome.error() {
//!         None => println!("{} (fresh for {:?}s)", outcome.body().unwrap(), outcome.ttl),
//!         Some(e) => eprintln!("{}", e),
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod telemetry;
pub mod transport;
pub mod ttl;

pub use config::DispatcherConfig;
pub use dispatcher::{Dispatcher, ResponseOutcome};
pub use error::{DispatchError, FetchError};
pub use ttl::{extract_ttl, extract_ttl_from_str};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default `User-Agent` sent by the built-in transports.
///
/// Format: `boundfetch/<version> (rust; <os>-<arch>)`.
pub fn user_agent() -> String {
    format!(
        "boundfetch/{} (rust; {}-{})",
        VERSION,
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}
