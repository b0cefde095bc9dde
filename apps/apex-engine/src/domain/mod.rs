//! Domain Layer
//!
//! Business logic with no I/O. Every type here is deterministic given its
//! inputs; clocks, venues and alert delivery live behind application ports.
//!
//! # Bounded Contexts
//!
//! - [`order_execution`]: Order aggregate and lifecycle status
//! - [`position_tracking`]: Position aggregate and exit triggers
//! - [`risk_management`]: Position sizing, stop/target levels, loss gates
//! - [`routing`]: Venue scoring, routing decisions, arbitrage detection
//! - [`execution_tactics`]: TWAP, VWAP and POV slicers
//! - [`advanced_orders`]: Iceberg, trailing stop and bracket state machines

pub mod advanced_orders;
pub mod execution_tactics;
pub mod order_execution;
pub mod position_tracking;
pub mod risk_management;
pub mod routing;
pub mod shared;
