//! Risk Management Bounded Context
//!
//! Position sizing, stop/target levels and the gates that decide whether a
//! new position may be opened. Gate failures are plain booleans (with an
//! optional [`GateRejection`] reason), never errors.

mod errors;
mod risk_config;
mod risk_manager;

pub use errors::RiskError;
pub use risk_config::{RiskConfig, RiskLevel};
pub use risk_manager::{GateRejection, RiskManager, RiskReport, RiskSnapshot};
