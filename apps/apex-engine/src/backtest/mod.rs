//! Backtesting
//!
//! Replays a single OHLCV series through a strategy, one position at a
//! time, with commission and slippage on every fill and the risk manager
//! supplying default levels and gating entries. Metrics are derived once
//! from the finished trade ledger and equity curve.

mod config;
mod engine;
mod error;
pub mod metrics;
pub mod strategy;
mod trade;

pub use config::BacktestConfig;
pub use engine::{BacktestEngine, BacktestResult};
pub use error::BacktestError;
pub use metrics::{PerformanceCalculator, PerformanceSummary};
pub use strategy::{BreakoutConfig, BreakoutStrategy, Signal, SignalKind, SignalSource};
pub use trade::{EquityPoint, Trade};
