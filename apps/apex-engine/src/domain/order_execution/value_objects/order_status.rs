//! Order status in the lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order lifecycle status.
///
/// ```text
/// PENDING -> OPEN -> PARTIALLY_FILLED -> FILLED
///    |        |            |
///    +--------+------------+--> CANCELED | REJECTED | EXPIRED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Created locally, not yet acknowledged by a venue.
    Pending,
    /// Accepted by a venue and working.
    Open,
    /// Some quantity filled.
    PartiallyFilled,
    /// Completely filled.
    Filled,
    /// Canceled before completion.
    Canceled,
    /// Rejected by the venue.
    Rejected,
    /// Expired at the venue.
    Expired,
}

impl OrderStatus {
    /// Returns true if the order is in a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Canceled | Self::Rejected | Self::Expired
        )
    }

    /// Returns true if the order is still working.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if a status report may move an order from `self` to `to`.
    ///
    /// Repeating the current status is always allowed. Fills may arrive
    /// before the venue acknowledgement, so PENDING can jump straight to a
    /// fill status.
    #[must_use]
    pub const fn can_transition_to(&self, to: Self) -> bool {
        if (*self as u8) == (to as u8) {
            return true;
        }
        matches!(
            (*self, to),
            (
                Self::Pending,
                Self::Open
                    | Self::PartiallyFilled
                    | Self::Filled
                    | Self::Canceled
                    | Self::Rejected
                    | Self::Expired
            ) | (
                Self::Open,
                Self::PartiallyFilled | Self::Filled | Self::Canceled | Self::Rejected | Self::Expired
            ) | (
                Self::PartiallyFilled,
                Self::Filled | Self::Canceled | Self::Expired
            )
        )
    }

    /// Returns true if the order can receive fills.
    #[must_use]
    pub const fn can_fill(&self) -> bool {
        matches!(self, Self::Pending | Self::Open | Self::PartiallyFilled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Open => write!(f, "OPEN"),
            Self::PartiallyFilled => write!(f, "PARTIALLY_FILLED"),
            Self::Filled => write!(f, "FILLED"),
            Self::Canceled => write!(f, "CANCELED"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}
