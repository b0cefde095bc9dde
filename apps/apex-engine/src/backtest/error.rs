//! Backtest errors.

use thiserror::Error;

/// Reasons a backtest cannot run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BacktestError {
    /// No bars to replay.
    #[error("OHLCV series is empty")]
    EmptySeries,

    /// Bars out of chronological order.
    #[error("bar {index} is not after the previous bar")]
    UnorderedSeries {
        /// Index of the offending bar.
        index: usize,
    },

    /// Invalid configuration value.
    #[error("invalid backtest config {field}: {message}")]
    InvalidConfig {
        /// Offending field.
        field: String,
        /// Error message.
        message: String,
    },
}

impl BacktestError {
    pub(crate) fn config(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.to_string(),
            message: message.into(),
        }
    }
}
