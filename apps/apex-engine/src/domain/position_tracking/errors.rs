//! Position errors.

use thiserror::Error;

/// Errors raised by position lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    /// Position parameters failed validation.
    #[error("invalid position parameter `{field}`: {message}")]
    InvalidParameters {
        /// Offending field.
        field: String,
        /// Error message.
        message: String,
    },

    /// Position was already closed.
    #[error("position already closed: {position_id}")]
    AlreadyClosed {
        /// Position identifier.
        position_id: String,
    },

    /// Position not present in the tracker.
    #[error("position not found: {position_id}")]
    NotFound {
        /// Position identifier.
        position_id: String,
    },
}
