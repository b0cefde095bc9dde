//! Order execution errors.

use rust_decimal::Decimal;
use thiserror::Error;

use super::value_objects::OrderStatus;

/// Errors raised by order construction and lifecycle transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Invalid order parameters.
    #[error("invalid order parameter `{field}`: {message}")]
    InvalidParameters {
        /// Field with invalid value.
        field: String,
        /// Error message.
        message: String,
    },

    /// Transition not allowed from the current status.
    #[error("invalid order state transition: {from} -> {to}")]
    InvalidStateTransition {
        /// Current status.
        from: OrderStatus,
        /// Attempted status.
        to: OrderStatus,
    },

    /// Fill larger than what is left on the order.
    #[error("fill of {fill_qty} exceeds remaining {remaining}")]
    FillExceedsRemaining {
        /// Attempted fill quantity.
        fill_qty: Decimal,
        /// Remaining quantity.
        remaining: Decimal,
    },

    /// Order not present in the ledger.
    #[error("order not found: {order_id}")]
    NotFound {
        /// Order identifier.
        order_id: String,
    },
}
