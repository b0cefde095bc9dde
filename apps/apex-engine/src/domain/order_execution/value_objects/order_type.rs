//! Order type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order type as understood by venues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Execute immediately at the best available price.
    Market,
    /// Execute at the limit price or better.
    Limit,
    /// Market order triggered when the stop price is reached.
    StopLoss,
    /// Limit order placed at a profit target.
    TakeProfit,
    /// Limit order triggered when the stop price is reached.
    StopLimit,
}

impl OrderType {
    /// Returns true if a limit price is required.
    #[must_use]
    pub const fn requires_price(&self) -> bool {
        matches!(self, Self::Limit | Self::TakeProfit | Self::StopLimit)
    }

    /// Returns true if a stop price is required.
    #[must_use]
    pub const fn requires_stop_price(&self) -> bool {
        matches!(self, Self::StopLoss | Self::StopLimit)
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Market => write!(f, "MARKET"),
            Self::Limit => write!(f, "LIMIT"),
            Self::StopLoss => write!(f, "STOP_LOSS"),
            Self::TakeProfit => write!(f, "TAKE_PROFIT"),
            Self::StopLimit => write!(f, "STOP_LIMIT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_requirements() {
        assert!(!OrderType::Market.requires_price());
        assert!(OrderType::Limit.requires_price());
        assert!(OrderType::TakeProfit.requires_price());
        assert!(OrderType::StopLoss.requires_stop_price());
        assert!(OrderType::StopLimit.requires_price());
        assert!(OrderType::StopLimit.requires_stop_price());
    }
}
