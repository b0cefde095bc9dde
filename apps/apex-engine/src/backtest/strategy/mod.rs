//! Strategy signal sources.
//!
//! A strategy sees the bars up to and including the current one and returns
//! zero or more signals. The engine owns the position; strategies never do.

mod breakout;
mod signal;

pub use breakout::{BreakoutConfig, BreakoutStrategy};
pub use signal::{Signal, SignalKind};

use crate::domain::shared::{Candle, Symbol};

/// Produces trading signals from a window of bars.
pub trait SignalSource {
    /// Name carried into backtest results.
    fn name(&self) -> &str;

    /// Signals for the last bar of `window`. `window` is oldest first and
    /// never contains bars after the current one.
    fn generate_signals(&mut self, symbol: &Symbol, window: &[Candle]) -> Vec<Signal>;
}
