//! Execution Tactics Bounded Context
//!
//! Slicing algorithms that decide how much of a parent order to send and
//! when:
//!
//! - **TWAP**: equal slices on a fixed interval
//! - **VWAP**: slices weighted by an intraday volume curve
//! - **POV**: slices sized from observed market volume, rate-limited
//!
//! Executors are plain state machines. They never sleep; callers (the
//! execution engine and the market monitor) drive them with a clock.

pub mod errors;
pub mod services;
pub mod value_objects;

pub use errors::TacticError;
pub use services::{PovExecutor, TwapExecutor, VwapExecutor, u_shaped_profile};
pub use value_objects::{
    AlgoKind, AlgoPerformance, AlgoStatus, PlannedSlice, PovParams, TwapParams, VwapParams,
};
