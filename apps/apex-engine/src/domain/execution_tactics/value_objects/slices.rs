//! Planned execution slice.

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One pre-computed slice of a TWAP or VWAP plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedSlice {
    /// Slice number (0-indexed).
    pub index: usize,
    /// Quantity for this slice.
    pub amount: Decimal,
    /// Seconds after execution start at which the slice becomes due.
    pub offset_seconds: i64,
}

impl PlannedSlice {
    /// Create a planned slice.
    #[must_use]
    pub const fn new(index: usize, amount: Decimal, offset_seconds: i64) -> Self {
        Self {
            index,
            amount,
            offset_seconds,
        }
    }

    /// Absolute due time for an execution started at `start`.
    #[must_use]
    pub fn due_at(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        start + TimeDelta::seconds(self.offset_seconds)
    }
}
