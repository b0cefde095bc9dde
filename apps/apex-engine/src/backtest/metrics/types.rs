//! Performance summary.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Metrics derived from a finished backtest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    // Returns
    /// Starting capital.
    pub initial_equity: Decimal,
    /// Capital after the last close.
    pub final_equity: Decimal,
    /// Absolute return.
    pub total_return: Decimal,
    /// Return as a percent of starting capital.
    pub total_return_percent: Decimal,

    // Trade statistics
    /// Closed trades.
    pub total_trades: u64,
    /// Trades with positive net P&L.
    pub winning_trades: u64,
    /// Trades with negative net P&L.
    pub losing_trades: u64,
    /// Winning trades over all trades, in percent.
    pub win_rate: Decimal,
    /// Average winning trade.
    pub avg_win: Decimal,
    /// Average losing trade (positive value).
    pub avg_loss: Decimal,
    /// Gross profit over gross loss; `None` with no losing trades.
    pub profit_factor: Option<Decimal>,
    /// Average win over average loss.
    pub payoff_ratio: Option<Decimal>,
    /// Expected net P&L per trade.
    pub expectancy: Decimal,
    /// Sum of winning net P&L.
    pub gross_profit: Decimal,
    /// Sum of losing net P&L (positive value).
    pub gross_loss: Decimal,
    /// Commission paid.
    pub total_commission: Decimal,
    /// Longest run of winners.
    pub max_consecutive_wins: u64,
    /// Longest run of losers.
    pub max_consecutive_losses: u64,

    // Drawdown
    /// Largest peak-to-trough decline in equity.
    pub max_drawdown: Decimal,
    /// That decline as a percent of its peak.
    pub max_drawdown_percent: Decimal,

    // Risk-adjusted
    /// Mean over population std of per-bar returns, times sqrt(252).
    pub sharpe_ratio: Option<Decimal>,
    /// Mean over downside deviation of per-bar returns, times sqrt(252).
    pub sortino_ratio: Option<Decimal>,
}
