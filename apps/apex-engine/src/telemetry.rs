//! Tracing Setup
//!
//! Installs a `tracing-subscriber` formatter for the embedding binary.
//!
//! # Configuration
//!
//! - `RUST_LOG`: filter directives; falls back to the configured level
//! - `observability.logging.format`: `json` for structured output, `pretty`
//!   for local development
//!
//! # Usage
//!
//! ```rust,ignore
//! use apex_engine::{config::load_config, telemetry::init_telemetry};
//!
//! let config = load_config(None)?;
//! init_telemetry(&config.observability.logging)?;
//! ```

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Subscriber installation failures.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The configured level is not a valid filter directive.
    #[error("invalid log filter '{filter}': {message}")]
    InvalidFilter {
        /// Filter that failed to parse.
        filter: String,
        /// Parser message.
        message: String,
    },

    /// A global subscriber is already installed.
    #[error("tracing subscriber already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Build the filter: `RUST_LOG` when set, the configured level otherwise.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(&config.level).map_err(|e| TelemetryError::InvalidFilter {
            filter: config.level.clone(),
            message: e.to_string(),
        })
    })
}

/// Install the global subscriber.
pub fn init_telemetry(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter = env_filter(config)?;

    let installed = if config.format == "pretty" {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .try_init()
    };
    installed.map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;

    tracing::info!(level = %config.level, format = %config.format, "Telemetry initialized");
    Ok(())
}
