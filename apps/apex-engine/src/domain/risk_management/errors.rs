//! Risk management errors.

use thiserror::Error;

/// Errors raised by risk configuration and bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RiskError {
    /// Risk configuration value out of range.
    #[error("invalid risk configuration `{field}`: {message}")]
    InvalidConfiguration {
        /// Offending field.
        field: String,
        /// Error message.
        message: String,
    },

    /// Input to a risk calculation was unusable.
    #[error("invalid risk input `{field}`: {message}")]
    InvalidInput {
        /// Offending input.
        field: String,
        /// Error message.
        message: String,
    },
}
