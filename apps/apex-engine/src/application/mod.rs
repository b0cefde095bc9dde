//! Application Layer
//!
//! Orchestrates the domain through services that own the shared registries.
//! It defines:
//!
//! - **Ports**: Interfaces to venues, alert delivery and time
//! - **Services**: Router, execution engine, order/position ledgers, risk
//!   gate, advanced order manager and the market monitor

pub mod ports;
pub mod services;

pub use ports::*;
pub use services::*;
