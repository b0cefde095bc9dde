//! Position Aggregate Root
//!
//! `unrealized = (mark - entry) * qty` for longs and the inverse for shorts.
//! Realized P&L is written once, at close, and frozen afterwards.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::errors::PositionError;
use super::value_objects::{ExitReason, PositionSide, PositionStatus};
use crate::domain::shared::{Metadata, PositionId, Symbol};

/// Parameters for opening a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenPositionParams {
    /// Symbol held.
    pub symbol: Symbol,
    /// Long or short.
    pub side: PositionSide,
    /// Entry fill price.
    pub entry_price: Decimal,
    /// Units held.
    pub quantity: Decimal,
    /// Protective stop level.
    pub stop_loss: Option<Decimal>,
    /// Profit target level.
    pub take_profit: Option<Decimal>,
    /// Entry time.
    pub opened_at: DateTime<Utc>,
    /// Free-form tags.
    pub metadata: Metadata,
}

/// Position Aggregate Root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    id: PositionId,
    symbol: Symbol,
    side: PositionSide,
    entry_price: Decimal,
    quantity: Decimal,
    stop_loss: Option<Decimal>,
    take_profit: Option<Decimal>,
    status: PositionStatus,
    mark_price: Decimal,
    unrealized_pnl: Decimal,
    realized_pnl: Option<Decimal>,
    opened_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    exit_price: Option<Decimal>,
    exit_reason: Option<ExitReason>,
    metadata: Metadata,
}

impl Position {
    /// Open a position.
    pub fn open(params: OpenPositionParams) -> Result<Self, PositionError> {
        if params.symbol.is_empty() {
            return Err(invalid("symbol", "symbol must not be empty"));
        }
        if params.entry_price <= Decimal::ZERO {
            return Err(invalid("entry_price", "entry price must be positive"));
        }
        if params.quantity <= Decimal::ZERO {
            return Err(invalid("quantity", "quantity must be positive"));
        }

        Ok(Self {
            id: PositionId::generate(),
            symbol: params.symbol,
            side: params.side,
            entry_price: params.entry_price,
            quantity: params.quantity,
            stop_loss: params.stop_loss,
            take_profit: params.take_profit,
            status: PositionStatus::Open,
            mark_price: params.entry_price,
            unrealized_pnl: Decimal::ZERO,
            realized_pnl: None,
            opened_at: params.opened_at,
            closed_at: None,
            exit_price: None,
            exit_reason: None,
            metadata: params.metadata,
        })
    }

    /// Position identifier.
    #[must_use]
    pub const fn id(&self) -> &PositionId {
        &self.id
    }

    /// Symbol held.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Long or short.
    #[must_use]
    pub const fn side(&self) -> PositionSide {
        self.side
    }

    /// Entry fill price.
    #[must_use]
    pub const fn entry_price(&self) -> Decimal {
        self.entry_price
    }

    /// Units held.
    #[must_use]
    pub const fn quantity(&self) -> Decimal {
        self.quantity
    }

    /// Stop-loss level.
    #[must_use]
    pub const fn stop_loss(&self) -> Option<Decimal> {
        self.stop_loss
    }

    /// Take-profit level.
    #[must_use]
    pub const fn take_profit(&self) -> Option<Decimal> {
        self.take_profit
    }

    /// Open or closed.
    #[must_use]
    pub const fn status(&self) -> PositionStatus {
        self.status
    }

    /// True while the position is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// Last mark price.
    #[must_use]
    pub const fn mark_price(&self) -> Decimal {
        self.mark_price
    }

    /// Unrealized P&L at the last mark.
    #[must_use]
    pub const fn unrealized_pnl(&self) -> Decimal {
        self.unrealized_pnl
    }

    /// Realized P&L, set at close.
    #[must_use]
    pub const fn realized_pnl(&self) -> Option<Decimal> {
        self.realized_pnl
    }

    /// Entry time.
    #[must_use]
    pub const fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// Close time.
    #[must_use]
    pub const fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    /// Exit price recorded at close.
    #[must_use]
    pub const fn exit_price(&self) -> Option<Decimal> {
        self.exit_price
    }

    /// Exit reason recorded at close.
    #[must_use]
    pub const fn exit_reason(&self) -> Option<ExitReason> {
        self.exit_reason
    }

    /// Metadata map.
    #[must_use]
    pub const fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Notional value at the last mark.
    #[must_use]
    pub fn market_value(&self) -> Decimal {
        self.mark_price * self.quantity
    }

    /// P&L if the position were valued at `price`.
    #[must_use]
    pub fn pnl_at(&self, price: Decimal) -> Decimal {
        match self.side {
            PositionSide::Long => (price - self.entry_price) * self.quantity,
            PositionSide::Short => (self.entry_price - price) * self.quantity,
        }
    }

    /// Re-mark the position and recompute unrealized P&L.
    pub fn update_mark(&mut self, price: Decimal) -> Result<Decimal, PositionError> {
        self.ensure_open()?;
        self.mark_price = price;
        self.unrealized_pnl = self.pnl_at(price);
        Ok(self.unrealized_pnl)
    }

    /// Exit trigger for a single observed price.
    ///
    /// Long: price at or below stop, or at or above target. Short mirrors.
    #[must_use]
    pub fn exit_trigger(&self, price: Decimal) -> Option<ExitReason> {
        self.bar_exit(price, price).map(|(reason, _)| reason)
    }

    /// Exit trigger over a bar's range, returning the triggered level.
    ///
    /// The stop is checked first, so a bar that spans both levels exits at
    /// the stop.
    #[must_use]
    pub fn bar_exit(&self, high: Decimal, low: Decimal) -> Option<(ExitReason, Decimal)> {
        match self.side {
            PositionSide::Long => {
                if let Some(stop) = self.stop_loss.filter(|s| low <= *s) {
                    return Some((ExitReason::StopLoss, stop));
                }
                self.take_profit
                    .filter(|t| high >= *t)
                    .map(|t| (ExitReason::TakeProfit, t))
            }
            PositionSide::Short => {
                if let Some(stop) = self.stop_loss.filter(|s| high >= *s) {
                    return Some((ExitReason::StopLoss, stop));
                }
                self.take_profit
                    .filter(|t| low <= *t)
                    .map(|t| (ExitReason::TakeProfit, t))
            }
        }
    }

    /// Close the position, freezing realized P&L.
    pub fn close(
        &mut self,
        exit_price: Decimal,
        reason: ExitReason,
        at: DateTime<Utc>,
    ) -> Result<Decimal, PositionError> {
        self.ensure_open()?;
        let realized = self.pnl_at(exit_price);

        self.mark_price = exit_price;
        self.unrealized_pnl = Decimal::ZERO;
        self.realized_pnl = Some(realized);
        self.exit_price = Some(exit_price);
        self.exit_reason = Some(reason);
        self.closed_at = Some(at);
        self.status = PositionStatus::Closed;
        self.metadata
            .insert("exit_reason".to_string(), reason.as_str().into());
        self.metadata
            .insert("exit_time".to_string(), at.to_rfc3339().into());

        Ok(realized)
    }

    fn ensure_open(&self) -> Result<(), PositionError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(PositionError::AlreadyClosed {
                position_id: self.id.to_string(),
            })
        }
    }
}

fn invalid(field: &str, message: &str) -> PositionError {
    PositionError::InvalidParameters {
        field: field.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn params(side: PositionSide) -> OpenPositionParams {
        OpenPositionParams {
            symbol: Symbol::new("BTC/USDT"),
            side,
            entry_price: dec!(50000),
            quantity: dec!(0.5),
            stop_loss: Some(match side {
                PositionSide::Long => dec!(49000),
                PositionSide::Short => dec!(51000),
            }),
            take_profit: Some(match side {
                PositionSide::Long => dec!(52500),
                PositionSide::Short => dec!(47500),
            }),
            opened_at: Utc::now(),
            metadata: Metadata::new(),
        }
    }

    #[test]
    fn long_unrealized_follows_mark() {
        let mut pos = Position::open(params(PositionSide::Long)).unwrap();
        assert_eq!(pos.update_mark(dec!(51000)).unwrap(), dec!(500));
    }

    #[test]
    fn short_unrealized_is_inverse() {
        let mut pos = Position::open(params(PositionSide::Short)).unwrap();
        assert_eq!(pos.update_mark(dec!(51000)).unwrap(), dec!(-500));
    }

    #[test]
    fn close_freezes_realized_pnl() {
        let mut pos = Position::open(params(PositionSide::Long)).unwrap();
        let realized = pos.close(dec!(52000), ExitReason::Manual, Utc::now()).unwrap();
        assert_eq!(realized, dec!(1000));
        assert_eq!(pos.realized_pnl(), Some(dec!(1000)));
        assert!(pos.update_mark(dec!(10)).is_err());
        assert!(pos.close(dec!(1), ExitReason::Manual, Utc::now()).is_err());
        assert_eq!(pos.realized_pnl(), Some(dec!(1000)));
        assert_eq!(
            pos.metadata().get("exit_reason"),
            Some(&serde_json::Value::from("manual"))
        );
    }

    #[test]
    fn long_bar_exit_prefers_stop() {
        let pos = Position::open(params(PositionSide::Long)).unwrap();
        assert_eq!(
            pos.bar_exit(dec!(53000), dec!(48500)),
            Some((ExitReason::StopLoss, dec!(49000)))
        );
        assert_eq!(
            pos.bar_exit(dec!(53000), dec!(49500)),
            Some((ExitReason::TakeProfit, dec!(52500)))
        );
        assert_eq!(pos.bar_exit(dec!(50500), dec!(49500)), None);
    }

    #[test]
    fn short_exit_trigger_mirrors_long() {
        let pos = Position::open(params(PositionSide::Short)).unwrap();
        assert_eq!(pos.exit_trigger(dec!(51000)), Some(ExitReason::StopLoss));
        assert_eq!(pos.exit_trigger(dec!(47000)), Some(ExitReason::TakeProfit));
        assert_eq!(pos.exit_trigger(dec!(50000)), None);
    }

    #[test]
    fn zero_quantity_rejected() {
        let mut p = params(PositionSide::Long);
        p.quantity = Decimal::ZERO;
        assert!(Position::open(p).is_err());
    }
}
