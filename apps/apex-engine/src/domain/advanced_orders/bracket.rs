//! Bracket Order
//!
//! One entry plus a stop-loss and a take-profit on the opposite side. The
//! protective legs are released once the entry fills and cancel each other
//! when either fills.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use super::errors::AdvancedOrderError;
use crate::domain::order_execution::{Order, OrderRequest, OrderSide, OrderType};
use crate::domain::shared::{AdvancedOrderId, OrderId, Symbol};

/// Bracket construction parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketParams {
    /// Symbol to trade.
    pub symbol: Symbol,
    /// Entry side; protective legs use the opposite side.
    pub side: OrderSide,
    /// Quantity for all three legs.
    pub amount: Decimal,
    /// Limit entry price; market entry when absent.
    pub entry_price: Option<Decimal>,
    /// Protective stop level.
    pub stop_loss_price: Decimal,
    /// Profit target level.
    pub take_profit_price: Decimal,
}

impl BracketParams {
    fn validate(&self) -> Result<(), AdvancedOrderError> {
        if self.symbol.is_empty() {
            return Err(AdvancedOrderError::invalid("symbol", "symbol must not be empty"));
        }
        if self.amount <= Decimal::ZERO {
            return Err(AdvancedOrderError::invalid("amount", "amount must be positive"));
        }
        if self.stop_loss_price <= Decimal::ZERO || self.take_profit_price <= Decimal::ZERO {
            return Err(bracket_error("stop loss and take profit must be positive"));
        }
        match self.side {
            OrderSide::Buy => {
                if self.stop_loss_price >= self.take_profit_price {
                    return Err(bracket_error("stop loss must be below take profit for BUY"));
                }
                if let Some(entry) = self.entry_price {
                    if self.stop_loss_price >= entry {
                        return Err(bracket_error("stop loss must be below entry for BUY"));
                    }
                    if self.take_profit_price <= entry {
                        return Err(bracket_error("take profit must be above entry for BUY"));
                    }
                }
            }
            OrderSide::Sell => {
                if self.stop_loss_price <= self.take_profit_price {
                    return Err(bracket_error("stop loss must be above take profit for SELL"));
                }
                if let Some(entry) = self.entry_price {
                    if self.stop_loss_price <= entry {
                        return Err(bracket_error("stop loss must be above entry for SELL"));
                    }
                    if self.take_profit_price >= entry {
                        return Err(bracket_error("take profit must be below entry for SELL"));
                    }
                }
            }
        }
        Ok(())
    }
}

fn bracket_error(message: &str) -> AdvancedOrderError {
    AdvancedOrderError::InvalidBracket {
        message: message.to_string(),
    }
}

/// Bracket lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BracketState {
    /// Entry not yet filled.
    Pending,
    /// Entry filled, protective legs working.
    EntryFilled,
    /// One protective leg filled.
    Completed,
    /// Cancelled by the caller.
    Canceled,
}

impl BracketState {
    /// True once no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }
}

impl fmt::Display for BracketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::EntryFilled => write!(f, "entry_filled"),
            Self::Completed => write!(f, "completed"),
            Self::Canceled => write!(f, "canceled"),
        }
    }
}

/// Which protective leg filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BracketLeg {
    /// Stop-loss leg.
    StopLoss,
    /// Take-profit leg.
    TakeProfit,
}

/// Point-in-time view of a bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketStatus {
    /// Lifecycle state.
    pub state: BracketState,
    /// Entry order id.
    pub entry_order_id: OrderId,
    /// Stop-loss order id.
    pub stop_order_id: OrderId,
    /// Take-profit order id.
    pub take_profit_order_id: OrderId,
    /// Leg that closed the bracket.
    pub exit_leg: Option<BracketLeg>,
    /// Reward-to-risk ratio.
    pub risk_reward: Decimal,
}

/// Bracket order state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketOrder {
    id: AdvancedOrderId,
    params: BracketParams,
    state: BracketState,
    entry: Order,
    stop: Order,
    take_profit: Order,
    exit_leg: Option<BracketLeg>,
}

impl BracketOrder {
    /// Validate levels and build the three linked orders.
    pub fn new(id: AdvancedOrderId, params: BracketParams) -> Result<Self, AdvancedOrderError> {
        params.validate()?;

        let entry_request = match params.entry_price {
            Some(price) => {
                OrderRequest::limit(params.symbol.clone(), params.side, params.amount, price)
            }
            None => OrderRequest::market(params.symbol.clone(), params.side, params.amount),
        }
        .with_meta("bracket_entry", true)
        .with_meta("bracket_id", id.as_str());
        let entry = Order::new(entry_request)?;

        let exit_side = params.side.opposite();
        let stop = Order::new(
            OrderRequest::market(params.symbol.clone(), exit_side, params.amount)
                .with_type(OrderType::StopLoss)
                .with_stop_price(params.stop_loss_price)
                .with_meta("bracket_stop", true)
                .with_meta("bracket_parent", entry.id().as_str())
                .with_meta("bracket_id", id.as_str()),
        )?;
        let take_profit = Order::new(
            OrderRequest::limit(
                params.symbol.clone(),
                exit_side,
                params.amount,
                params.take_profit_price,
            )
            .with_type(OrderType::TakeProfit)
            .with_meta("bracket_profit", true)
            .with_meta("bracket_parent", entry.id().as_str())
            .with_meta("bracket_id", id.as_str()),
        )?;

        let bracket = Self {
            id,
            params,
            state: BracketState::Pending,
            entry,
            stop,
            take_profit,
            exit_leg: None,
        };
        info!(
            id = %bracket.id,
            symbol = %bracket.params.symbol,
            entry = ?bracket.params.entry_price,
            stop = %bracket.params.stop_loss_price,
            target = %bracket.params.take_profit_price,
            rr = %bracket.risk_reward(),
            "Bracket created"
        );
        Ok(bracket)
    }

    /// Identifier.
    #[must_use]
    pub const fn id(&self) -> &AdvancedOrderId {
        &self.id
    }

    /// Parameters.
    #[must_use]
    pub const fn params(&self) -> &BracketParams {
        &self.params
    }

    /// Lifecycle state.
    #[must_use]
    pub const fn state(&self) -> BracketState {
        self.state
    }

    /// Entry order.
    #[must_use]
    pub const fn entry_order(&self) -> &Order {
        &self.entry
    }

    /// Stop-loss leg.
    #[must_use]
    pub const fn stop_order(&self) -> &Order {
        &self.stop
    }

    /// Take-profit leg.
    #[must_use]
    pub const fn take_profit_order(&self) -> &Order {
        &self.take_profit
    }

    /// All three orders: entry, stop-loss, take-profit.
    #[must_use]
    pub fn orders(&self) -> [&Order; 3] {
        [&self.entry, &self.stop, &self.take_profit]
    }

    /// `|take_profit - entry| / |entry - stop_loss|`, zero for a market entry.
    #[must_use]
    pub fn risk_reward(&self) -> Decimal {
        let Some(entry) = self.params.entry_price else {
            return Decimal::ZERO;
        };
        let risk = (entry - self.params.stop_loss_price).abs();
        if risk.is_zero() {
            return Decimal::ZERO;
        }
        (self.params.take_profit_price - entry).abs() / risk
    }

    /// Entry filled: release the stop-loss and take-profit for submission.
    pub fn on_entry_filled(&mut self) -> Result<[Order; 2], AdvancedOrderError> {
        if self.state != BracketState::Pending {
            return Err(AdvancedOrderError::state(self.state, "fill entry of"));
        }
        self.state = BracketState::EntryFilled;
        info!(id = %self.id, "Bracket entry filled");
        Ok([self.stop.clone(), self.take_profit.clone()])
    }

    /// A protective leg filled: return the other leg for cancellation.
    pub fn on_exit_filled(&mut self, filled: &OrderId) -> Result<Order, AdvancedOrderError> {
        if self.state != BracketState::EntryFilled {
            return Err(AdvancedOrderError::state(self.state, "fill exit of"));
        }
        let (leg, other) = if filled == self.stop.id() {
            (BracketLeg::StopLoss, &self.take_profit)
        } else if filled == self.take_profit.id() {
            (BracketLeg::TakeProfit, &self.stop)
        } else {
            return Err(AdvancedOrderError::UnknownLeg {
                order_id: filled.to_string(),
            });
        };
        let other = other.clone();
        self.exit_leg = Some(leg);
        self.state = BracketState::Completed;
        info!(id = %self.id, leg = ?leg, "Bracket exit filled");
        Ok(other)
    }

    /// Cancel the bracket. Orders already at a venue must be cancelled there.
    pub fn cancel(&mut self) -> Result<(), AdvancedOrderError> {
        if self.state.is_terminal() {
            return Err(AdvancedOrderError::state(self.state, "cancel"));
        }
        self.state = BracketState::Canceled;
        info!(id = %self.id, "Bracket canceled");
        Ok(())
    }

    /// Status snapshot.
    #[must_use]
    pub fn status(&self) -> BracketStatus {
        BracketStatus {
            state: self.state,
            entry_order_id: self.entry.id().clone(),
            stop_order_id: self.stop.id().clone(),
            take_profit_order_id: self.take_profit.id().clone(),
            exit_leg: self.exit_leg,
            risk_reward: self.risk_reward(),
        }
    }
}
