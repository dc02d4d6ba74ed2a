//! # Boilerplate Logging
//!
//! Console logging on top of `tracing`:
//!
//! - [`config`]: subscriber configuration from the environment and the
//!   runtime switches (timestamps, frame collapsing)
//! - [`format`]: per-line level/timestamp prefixing
//! - [`chain`]: error cause-chain rendering with dependency frame collapsing
//!
//! ## Example
//!
//! ```no_run
//! use boilerplate_logging::{init, LoggingConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! init(&LoggingConfig::from_env()?)?;
//! tracing::info!("ready");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod chain;
pub mod config;
pub mod format;

pub use chain::{chain, collapse_dependency_frames, format_error_chain, ChainOptions};
pub use config::{set_config, ConfigError, LogConfig, LogFormat, LoggingConfig};
pub use format::{prefix_lines, PrefixedFormat};

use tracing_subscriber::fmt::format::DefaultFields;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Errors raised while installing the subscriber
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// Configuration was rejected
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A global subscriber is already installed
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Text layer writing prefixed lines to stdout.
///
/// Use this when composing a custom registry; [`init`] uses it for the
/// `text` format.
#[must_use]
pub fn console_layer<S>() -> fmt::Layer<S, DefaultFields, PrefixedFormat>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer().event_format(PrefixedFormat::new())
}

/// Install the global subscriber and apply the runtime switches.
///
/// # Errors
///
/// Returns error if the configuration is invalid or a subscriber is already
/// installed
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    config.validate()?;
    let filter = EnvFilter::try_new(&config.level).map_err(|e| {
        ConfigError::ValidationError(format!("invalid level directive {:?}: {e}", config.level))
    })?;

    set_config(config.runtime());

    let output = match config.format {
        LogFormat::Text => console_layer().boxed(),
        LogFormat::Json => fmt::layer().json().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)
}
