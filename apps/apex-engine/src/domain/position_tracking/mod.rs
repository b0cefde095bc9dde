//! Position Tracking Bounded Context
//!
//! Positions are opened from accepted signals, re-marked as prices move and
//! closed exactly once. Closed positions are kept for audit, never deleted.

mod errors;
mod position;
mod value_objects;

pub use errors::PositionError;
pub use position::{OpenPositionParams, Position};
pub use value_objects::{ExitReason, PositionSide, PositionStatus};
