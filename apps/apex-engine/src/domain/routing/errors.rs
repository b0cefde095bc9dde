//! Routing errors.

use thiserror::Error;

use crate::domain::order_execution::OrderError;

/// Fatal routing errors.
///
/// Individual venue failures are absorbed by reliability decay and
/// failover; only exhaustion surfaces here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// No venue produced usable market data (or none is registered).
    #[error("no venues available for {symbol}")]
    NoVenuesAvailable {
        /// Symbol being routed.
        symbol: String,
    },

    /// Every scored venue rejected the order.
    #[error("all venues failed for {symbol}: tried {}", attempts.join(", "))]
    AllVenuesFailed {
        /// Symbol being routed.
        symbol: String,
        /// Venues tried, in order.
        attempts: Vec<String>,
    },

    /// Venue name not registered.
    #[error("unknown venue: {venue}")]
    UnknownVenue {
        /// Venue name.
        venue: String,
    },

    /// Order could not be prepared for routing.
    #[error(transparent)]
    Order(#[from] OrderError),
}
