//! Position Tracker Service
//!
//! Book of open and closed positions. Closing never deletes: the position
//! moves to the closed list with its realized P&L frozen.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::domain::position_tracking::{
    ExitReason, OpenPositionParams, Position, PositionError, PositionSide,
};
use crate::domain::shared::{PositionId, Symbol};

/// Serializable copy of the book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionBookSnapshot {
    /// Open positions.
    pub open: Vec<Position>,
    /// Closed positions, oldest first.
    pub closed: Vec<Position>,
}

/// An open position whose stop or target was reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitSignal {
    /// Position to close.
    pub position_id: PositionId,
    /// Symbol held.
    pub symbol: Symbol,
    /// Which level was reached.
    pub reason: ExitReason,
    /// Price that reached it.
    pub price: Decimal,
}

/// Realized and unrealized P&L across the book.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PnlSummary {
    /// Sum over open positions.
    pub unrealized: Decimal,
    /// Sum over closed positions.
    pub realized: Decimal,
    /// `unrealized + realized`.
    pub total: Decimal,
}

/// Book statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionStatistics {
    /// P&L totals.
    pub pnl: PnlSummary,
    /// Open positions.
    pub open_positions: usize,
    /// Closed positions.
    pub closed_positions: usize,
    /// Open longs.
    pub long_positions: usize,
    /// Open shorts.
    pub short_positions: usize,
    /// Closed with positive P&L.
    pub winning_trades: usize,
    /// Closed flat or at a loss.
    pub losing_trades: usize,
    /// `winning / closed`, zero with no closed positions.
    pub win_rate: Decimal,
}

#[derive(Debug, Default)]
struct PositionBook {
    open: BTreeMap<PositionId, Position>,
    closed: Vec<Position>,
}

/// Position book service.
#[derive(Debug, Default)]
pub struct PositionTracker {
    book: RwLock<PositionBook>,
}

impl PositionTracker {
    /// Create an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open and record a position.
    pub async fn open_position(
        &self,
        params: OpenPositionParams,
    ) -> Result<Position, PositionError> {
        let position = Position::open(params)?;
        info!(
            position_id = %position.id(),
            symbol = %position.symbol(),
            side = %position.side(),
            entry = %position.entry_price(),
            quantity = %position.quantity(),
            "Position opened"
        );
        self.book
            .write()
            .await
            .open
            .insert(position.id().clone(), position.clone());
        Ok(position)
    }

    /// Close a position at `exit_price`, moving it to the closed list.
    pub async fn close_position(
        &self,
        id: &PositionId,
        exit_price: Decimal,
        reason: ExitReason,
        at: DateTime<Utc>,
    ) -> Result<Position, PositionError> {
        let mut book = self.book.write().await;
        let mut position = book.open.remove(id).ok_or_else(|| PositionError::NotFound {
            position_id: id.to_string(),
        })?;
        let realized = match position.close(exit_price, reason, at) {
            Ok(pnl) => pnl,
            Err(e) => {
                book.open.insert(id.clone(), position);
                return Err(e);
            }
        };
        info!(
            position_id = %id,
            symbol = %position.symbol(),
            exit = %exit_price,
            reason = reason.as_str(),
            pnl = %realized,
            "Position closed"
        );
        book.closed.push(position.clone());
        Ok(position)
    }

    /// Look up a position, open or closed.
    pub async fn get(&self, id: &PositionId) -> Option<Position> {
        let book = self.book.read().await;
        book.open
            .get(id)
            .cloned()
            .or_else(|| book.closed.iter().find(|p| p.id() == id).cloned())
    }

    /// Open positions.
    pub async fn open_positions(&self) -> Vec<Position> {
        self.book.read().await.open.values().cloned().collect()
    }

    /// Open positions in `symbol`.
    pub async fn positions_for(&self, symbol: &Symbol) -> Vec<Position> {
        self.book
            .read()
            .await
            .open
            .values()
            .filter(|p| p.symbol() == symbol)
            .cloned()
            .collect()
    }

    /// Closed positions, newest first.
    pub async fn closed_positions(&self, limit: Option<usize>) -> Vec<Position> {
        let book = self.book.read().await;
        book.closed
            .iter()
            .rev()
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// Re-mark every open position that has a price in `prices`.
    pub async fn update_marks(&self, prices: &HashMap<Symbol, Decimal>) -> usize {
        let mut book = self.book.write().await;
        let mut updated = 0;
        for position in book.open.values_mut() {
            let Some(price) = prices.get(position.symbol()) else {
                continue;
            };
            match position.update_mark(*price) {
                Ok(_) => updated += 1,
                Err(e) => warn!(position_id = %position.id(), error = %e, "Mark update skipped"),
            }
        }
        updated
    }

    /// Open positions whose stop or target is reached at `prices`.
    pub async fn check_exit_conditions(&self, prices: &HashMap<Symbol, Decimal>) -> Vec<ExitSignal> {
        let book = self.book.read().await;
        book.open
            .values()
            .filter_map(|position| {
                let price = *prices.get(position.symbol())?;
                position.exit_trigger(price).map(|reason| ExitSignal {
                    position_id: position.id().clone(),
                    symbol: position.symbol().clone(),
                    reason,
                    price,
                })
            })
            .collect()
    }

    /// Cash plus the market value of open positions.
    ///
    /// Positions without an entry in `prices` are valued at their last mark.
    pub async fn portfolio_value(&self, cash: Decimal, prices: &HashMap<Symbol, Decimal>) -> Decimal {
        let book = self.book.read().await;
        book.open.values().fold(cash, |acc, position| {
            let value = prices
                .get(position.symbol())
                .map_or_else(|| position.market_value(), |p| *p * position.quantity());
            acc + value
        })
    }

    /// P&L totals.
    pub async fn total_pnl(&self) -> PnlSummary {
        let book = self.book.read().await;
        pnl_of(&book)
    }

    /// Book statistics.
    pub async fn statistics(&self) -> PositionStatistics {
        let book = self.book.read().await;
        let winning_trades = book
            .closed
            .iter()
            .filter(|p| p.realized_pnl().is_some_and(|pnl| pnl > Decimal::ZERO))
            .count();
        let closed_positions = book.closed.len();
        let win_rate = if closed_positions == 0 {
            Decimal::ZERO
        } else {
            Decimal::from(winning_trades) / Decimal::from(closed_positions)
        };
        PositionStatistics {
            pnl: pnl_of(&book),
            open_positions: book.open.len(),
            closed_positions,
            long_positions: count_side(&book, PositionSide::Long),
            short_positions: count_side(&book, PositionSide::Short),
            winning_trades,
            losing_trades: closed_positions - winning_trades,
            win_rate,
        }
    }

    /// Copy of the whole book.
    pub async fn snapshot(&self) -> PositionBookSnapshot {
        let book = self.book.read().await;
        PositionBookSnapshot {
            open: book.open.values().cloned().collect(),
            closed: book.closed.clone(),
        }
    }

    /// Replace the book with a snapshot.
    pub async fn restore(&self, snapshot: PositionBookSnapshot) {
        let mut book = self.book.write().await;
        book.open = snapshot
            .open
            .into_iter()
            .map(|p| (p.id().clone(), p))
            .collect();
        book.closed = snapshot.closed;
        info!(
            open = book.open.len(),
            closed = book.closed.len(),
            "Position book restored"
        );
    }
}

fn pnl_of(book: &PositionBook) -> PnlSummary {
    let unrealized: Decimal = book.open.values().map(Position::unrealized_pnl).sum();
    let realized: Decimal = book.closed.iter().filter_map(Position::realized_pnl).sum();
    PnlSummary {
        unrealized,
        realized,
        total: unrealized + realized,
    }
}

fn count_side(book: &PositionBook, side: PositionSide) -> usize {
    book.open.values().filter(|p| p.side() == side).count()
}
