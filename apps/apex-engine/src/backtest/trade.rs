//! Closed-trade record and equity curve point.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::position_tracking::{ExitReason, PositionSide};
use crate::domain::shared::Symbol;

/// An immutable closed trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Sequential identifier within the run.
    pub trade_id: String,
    /// Symbol traded.
    pub symbol: Symbol,
    /// Long or short.
    pub side: PositionSide,
    /// Bar time of the entry.
    pub entry_time: DateTime<Utc>,
    /// Bar time of the exit.
    pub exit_time: DateTime<Utc>,
    /// Entry fill price, slippage included.
    pub entry_price: Decimal,
    /// Reference exit level: the triggered stop/target or the bar close.
    pub exit_price: Decimal,
    /// Exit fill price, slippage included.
    pub exit_fill_price: Decimal,
    /// Units traded.
    pub quantity: Decimal,
    /// Stop-loss level in force.
    pub stop_loss: Option<Decimal>,
    /// Take-profit level in force.
    pub take_profit: Option<Decimal>,
    /// P&L before commission.
    pub gross_pnl: Decimal,
    /// Commission on entry and exit notional.
    pub commission: Decimal,
    /// P&L after commission.
    pub pnl: Decimal,
    /// Net P&L as a percent of entry notional.
    pub pnl_percent: Decimal,
    /// Why the trade closed.
    pub exit_reason: ExitReason,
    /// Hours between entry and exit.
    pub holding_period_hours: Decimal,
}

impl Trade {
    /// Whether the trade made money after commission.
    #[must_use]
    pub fn is_winner(&self) -> bool {
        self.pnl > Decimal::ZERO
    }

    /// Whether the trade lost money after commission.
    #[must_use]
    pub fn is_loser(&self) -> bool {
        self.pnl < Decimal::ZERO
    }
}

/// One point of the equity curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquityPoint {
    /// Bar time.
    pub time: DateTime<Utc>,
    /// Capital plus unrealized P&L at the bar close.
    pub equity: Decimal,
    /// Bar close.
    pub price: Decimal,
}
