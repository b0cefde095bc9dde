//! Routing priority.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the router optimises for when ranking venues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingPriority {
    /// Best ask for buys, best bid for sells.
    #[default]
    Price,
    /// Lowest taker fee.
    Fees,
    /// Lowest observed latency.
    Speed,
    /// Highest 24h volume.
    Liquidity,
    /// Highest reliability score.
    Reliability,
}

impl fmt::Display for RoutingPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Price => write!(f, "price"),
            Self::Fees => write!(f, "fees"),
            Self::Speed => write!(f, "speed"),
            Self::Liquidity => write!(f, "liquidity"),
            Self::Reliability => write!(f, "reliability"),
        }
    }
}
