//! Logging configuration.
//!
//! Two layers of configuration live here:
//!
//! - [`LoggingConfig`]: how the global subscriber is built (filter, output
//!   format). Loaded from the environment and validated once at startup.
//! - [`LogConfig`]: the runtime switches read every time a line is formatted
//!   (timestamps, dependency frame collapsing). These can be changed after the
//!   subscriber is installed, which is what the HTTP pipeline builder does when
//!   it is given logging options.
//!
//! # Example
//!
//! ```no_run
//! use boilerplate_logging::config::LoggingConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LoggingConfig::from_env()?;
//! boilerplate_logging::init(&config)?;
//! # Ok(())
//! # }
//! ```

use once_cell::sync::Lazy;
use std::fmt;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};
use tracing_subscriber::EnvFilter;

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid output format
    #[error("Invalid log format: {0} (expected \"text\" or \"json\")")]
    InvalidFormat(String),
    /// Invalid boolean value for a switch
    #[error("Invalid boolean for {key}: {value}")]
    InvalidBool {
        /// Variable name
        key: String,
        /// Raw value
        value: String,
    },
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Output format of the console subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable lines, prefixed with the level (and timestamp)
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidFormat(s.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Subscriber configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter directive (`info`, `warn,boilerplate_web=debug`, ...)
    pub level: String,
    /// Output format
    pub format: LogFormat,
    /// Prefix each line with an RFC 3339 timestamp
    pub timestamp: bool,
    /// Collapse dependency frames in rendered backtraces
    pub collapse_dependency_frames: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            timestamp: false,
            collapse_dependency_frames: true,
        }
    }
}

impl LoggingConfig {
    /// Load configuration from the process environment.
    ///
    /// Reads `LOG_LEVEL` (falls back to `RUST_LOG`), `LOG_FORMAT`,
    /// `LOG_TIMESTAMP` and `LOG_COLLAPSE_FRAMES`. Missing variables keep
    /// their defaults.
    ///
    /// # Errors
    ///
    /// Returns error if a variable holds an invalid value
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns error if a value is invalid
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(level) = lookup("LOG_LEVEL").or_else(|| lookup("RUST_LOG")) {
            config.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            config.format = format.parse()?;
        }
        if let Some(value) = lookup("LOG_TIMESTAMP") {
            config.timestamp = parse_bool("LOG_TIMESTAMP", &value)?;
        }
        if let Some(value) = lookup("LOG_COLLAPSE_FRAMES") {
            config.collapse_dependency_frames = parse_bool("LOG_COLLAPSE_FRAMES", &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if the filter directive cannot be parsed
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.level.trim().is_empty() {
            return Err(ConfigError::ValidationError("level cannot be empty".to_string()));
        }
        EnvFilter::try_new(&self.level).map_err(|e| {
            ConfigError::ValidationError(format!("invalid level directive {:?}: {e}", self.level))
        })?;
        Ok(())
    }

    /// Runtime switches derived from this configuration
    #[must_use]
    pub const fn runtime(&self) -> LogConfig {
        LogConfig {
            timestamp: self.timestamp,
            collapse_dependency_frames: self.collapse_dependency_frames,
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Runtime logging switches, read at format time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    /// Prefix each line with a timestamp
    pub timestamp: bool,
    /// Collapse dependency frames in rendered backtraces
    pub collapse_dependency_frames: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            timestamp: false,
            collapse_dependency_frames: true,
        }
    }
}

static CURRENT: Lazy<RwLock<LogConfig>> = Lazy::new(|| RwLock::new(LogConfig::default()));

/// Replace the process-wide runtime switches
pub fn set_config(config: LogConfig) {
    *CURRENT.write().unwrap_or_else(PoisonError::into_inner) = config;
}

/// Current process-wide runtime switches
#[must_use]
pub fn config() -> LogConfig {
    *CURRENT.read().unwrap_or_else(PoisonError::into_inner)
}
