//! Advanced order errors.

use thiserror::Error;

use crate::domain::order_execution::OrderError;

/// Errors raised by iceberg, trailing-stop and bracket orders.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdvancedOrderError {
    /// Invalid construction parameter.
    #[error("invalid parameter {field}: {message}")]
    InvalidParameters {
        /// Offending field.
        field: String,
        /// Error message.
        message: String,
    },

    /// Bracket levels on the wrong side of the entry.
    #[error("invalid bracket: {message}")]
    InvalidBracket {
        /// Error message.
        message: String,
    },

    /// Trailing stop with zero or both trail forms.
    #[error("invalid trailing stop: {message}")]
    InvalidTrail {
        /// Error message.
        message: String,
    },

    /// No advanced order registered under the id.
    #[error("advanced order not found: {id}")]
    NotFound {
        /// Advanced order identifier.
        id: String,
    },

    /// The id refers to an order of another kind.
    #[error("advanced order {id} is not a {expected}")]
    WrongKind {
        /// Advanced order identifier.
        id: String,
        /// Kind the caller asked for.
        expected: &'static str,
    },

    /// Operation not allowed in the current state.
    #[error("cannot {action} advanced order in state {state}")]
    InvalidState {
        /// Current state.
        state: String,
        /// Attempted action.
        action: &'static str,
    },

    /// A filled order that is neither bracket leg.
    #[error("order {order_id} is not a leg of this bracket")]
    UnknownLeg {
        /// Order identifier.
        order_id: String,
    },

    /// Child order could not be built.
    #[error(transparent)]
    Order(#[from] OrderError),
}

impl AdvancedOrderError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidParameters {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn state(state: impl std::fmt::Display, action: &'static str) -> Self {
        Self::InvalidState {
            state: state.to_string(),
            action,
        }
    }
}
