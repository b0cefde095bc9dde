//! Venue Port (Driven Port)
//!
//! Capability the router needs from a trading venue. Any call may fail; the
//! router treats failures as transient and never lets one crash a routing
//! pass.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::Order;
use crate::domain::shared::{Candle, Symbol, VenueOrderId};

/// Top of book and 24h volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticker {
    /// Symbol quoted.
    pub symbol: Symbol,
    /// Best bid.
    pub bid: Decimal,
    /// Best ask.
    pub ask: Decimal,
    /// Last trade price.
    pub last: Decimal,
    /// Rolling 24h volume.
    pub volume: Decimal,
    /// Quote time.
    pub timestamp: DateTime<Utc>,
}

impl Ticker {
    /// Bid/ask midpoint.
    #[must_use]
    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::TWO
    }
}

/// Fee schedule as fractions of notional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fees {
    /// Maker fee.
    pub maker: Decimal,
    /// Taker fee.
    pub taker: Decimal,
}

/// Balance of one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Asset code.
    pub asset: String,
    /// Available.
    pub free: Decimal,
    /// Reserved by open orders.
    pub used: Decimal,
    /// `free + used`.
    pub total: Decimal,
}

/// Venue call failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VenueError {
    /// Transport or API failure.
    #[error("venue network error: {message}")]
    Network {
        /// Error details.
        message: String,
    },

    /// Order refused by the venue.
    #[error("order rejected by venue: {reason}")]
    Rejected {
        /// Rejection reason.
        reason: String,
    },

    /// Symbol not listed.
    #[error("unknown symbol: {symbol}")]
    UnknownSymbol {
        /// Symbol requested.
        symbol: String,
    },

    /// Venue disconnected or in maintenance.
    #[error("venue unavailable: {venue}")]
    Unavailable {
        /// Venue name.
        venue: String,
    },
}

/// Port for one trading venue.
#[async_trait]
pub trait VenuePort: Send + Sync {
    /// Unique venue name used as the registry key.
    fn name(&self) -> &str;

    /// Whether the venue currently has a session.
    fn is_connected(&self) -> bool {
        true
    }

    /// Current ticker.
    async fn ticker(&self, symbol: &Symbol) -> Result<Ticker, VenueError>;

    /// Recent OHLCV bars, oldest first.
    async fn ohlcv(
        &self,
        symbol: &Symbol,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, VenueError>;

    /// Place an order; returns it with the venue's status applied.
    async fn place_order(&self, order: Order) -> Result<Order, VenueError>;

    /// Cancel a working order. `Ok(false)` when the venue did not know it.
    async fn cancel_order(
        &self,
        venue_order_id: &VenueOrderId,
        symbol: &Symbol,
    ) -> Result<bool, VenueError>;

    /// Balances, optionally filtered to one asset.
    async fn balance(&self, asset: Option<&str>) -> Result<Vec<Balance>, VenueError>;

    /// Fee schedule.
    async fn fees(&self) -> Result<Fees, VenueError>;

    /// Listed symbols.
    async fn symbols(&self) -> Result<Vec<Symbol>, VenueError>;
}
