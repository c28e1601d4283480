//! INI configuration file.
//!
//! ```ini
//! [dispatcher]
//! max_concurrency = 20
//! reprobe = false
//!
//! [transport]
//! order = fetch, stream
//! timeout = 30
//! user_agent = my-app/1.0
//!
//! [logging]
//! level = info
//! file = /var/log/boundfetch.log
//! ```
//!
//! Every key is optional; missing keys keep their defaults.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};
use thiserror::Error;
use tracing::debug;

use super::DispatcherConfig;
use crate::logging::LogConfig;
use crate::transport::TransportKind;

/// Directory name under the platform config directory.
const CONFIG_DIR_NAME: &str = "boundfetch";

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.ini";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read or parsed.
    #[error("Failed to read config file {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    /// The text is not valid INI.
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// A key holds a value that cannot be used.
    #[error("Invalid value for {section}.{key}: '{value}' ({reason})")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Settings loaded from a configuration file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfigFile {
    /// Dispatcher and transport settings.
    pub dispatcher: DispatcherConfig,
    /// Logging settings.
    pub logging: LogConfig,
}

impl ConfigFile {
    /// Default location: `<config dir>/boundfetch/config.ini`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Self::from_ini(&ini)
    }

    /// Loads from `path`, or from the default location if `None`.
    ///
    /// A missing file yields defaults. An explicit path that does not exist
    /// is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Parses configuration from INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("dispatcher")) {
            if let Some(value) = section.get("max_concurrency") {
                config.dispatcher.max_concurrency = parse_concurrency(value)?;
            }
            if let Some(value) = parse_key::<bool>(section, "dispatcher", "reprobe")? {
                config.dispatcher.reprobe = value;
            }
        }

        if let Some(section) = ini.section(Some("transport")) {
            if let Some(value) = section.get("order") {
                config.dispatcher.transport.order = parse_order(value)?;
            }
            if let Some(secs) = parse_key::<u64>(section, "transport", "timeout")? {
                config.dispatcher.transport.timeout = Duration::from_secs(secs);
            }
            if let Some(value) = section.get("user_agent") {
                config.dispatcher.transport.user_agent = value.trim().to_string();
            }
        }

        if let Some(section) = ini.section(Some("logging")) {
            if let Some(value) = section.get("level") {
                config.logging.level = value.trim().to_string();
            }
            if let Some(value) = section.get("file") {
                let value = value.trim();
                config.logging.file = (!value.is_empty()).then(|| PathBuf::from(value));
            }
        }

        Ok(config)
    }
}

fn parse_key<T>(
    section: &Properties,
    section_name: &'static str,
    key: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    section
        .get(key)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidValue {
                    section: section_name,
                    key,
                    value: value.to_string(),
                    reason: e.to_string(),
                })
        })
        .transpose()
}

/// Parses the concurrency cap, rejecting zero and negative values.
fn parse_concurrency(value: &str) -> Result<usize, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        section: "dispatcher",
        key: "max_concurrency",
        value: value.to_string(),
        reason,
    };

    let parsed = value
        .trim()
        .parse::<i64>()
        .map_err(|e| invalid(e.to_string()))?;
    if parsed < 1 {
        return Err(invalid("must be at least 1".to_string()));
    }
    usize::try_from(parsed).map_err(|e| invalid(e.to_string()))
}

fn parse_order(value: &str) -> Result<Vec<TransportKind>, ConfigError> {
    let order = value
        .split(',')
        .filter(|name| !name.trim().is_empty())
        .map(|name| {
            name.parse::<TransportKind>()
                .map_err(|e| ConfigError::InvalidValue {
                    section: "transport",
                    key: "order",
                    value: value.to_string(),
                    reason: e.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if order.is_empty() {
        return Err(ConfigError::InvalidValue {
            section: "transport",
            key: "order",
            value: value.to_string(),
            reason: "at least one transport is required".to_string(),
        });
    }
    Ok(order)
}
