//! Performance metrics for backtest evaluation.
//!
//! Derived once from the finished trade ledger and equity curve:
//! - Sharpe and Sortino ratios over per-bar equity returns
//! - Maximum drawdown, absolute and percent
//! - Profit factor, win rate, expectancy and streaks

mod calculator;
mod constants;
mod math;
mod types;

pub use calculator::PerformanceCalculator;
pub use types::PerformanceSummary;
