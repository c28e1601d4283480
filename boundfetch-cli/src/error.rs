//! CLI error type.

use std::fmt;

use boundfetch::config::ConfigError;
use boundfetch::logging::LoggingError;
use boundfetch::DispatchError;

/// Errors surfaced to the user by the `boundfetch` binary.
#[derive(Debug)]
pub enum CliError {
    /// The configuration file could not be loaded.
    Config(String),
    /// Logging could not be set up.
    Logging(String),
    /// The Tokio runtime could not be started.
    Runtime(String),
    /// The dispatcher could not run requests at all.
    Dispatch(DispatchError),
    /// Some requests completed with an error.
    RequestsFailed { failed: usize, total: usize },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Logging(msg) => write!(f, "Logging error: {}", msg),
            CliError::Runtime(msg) => write!(f, "Failed to start runtime: {}", msg),
            CliError::Dispatch(e) => write!(f, "{}", e),
            CliError::RequestsFailed { failed, total } => {
                write!(f, "{} of {} requests failed", failed, total)
            }
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e.to_string())
    }
}

impl From<DispatchError> for CliError {
    fn from(e: DispatchError) -> Self {
        CliError::Dispatch(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requests_failed_message() {
        let err = CliError::RequestsFailed {
            failed: 2,
            total: 5,
        };
        assert_eq!(err.to_string(), "2 of 5 requests failed");
    }

    #[test]
    fn test_dispatch_error_passes_through() {
        let err = CliError::from(DispatchError::NoTransport {
            tried: vec!["fetch".to_string()],
        });
        assert_eq!(
            err.to_string(),
            "No request transport available (tried: fetch)"
        );
    }
}
