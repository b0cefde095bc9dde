//! Iceberg Order
//!
//! Works a large order through smaller visible chunks. The visible size is
//! redrawn after every fill as `display_size * (1 + u)` with `u` uniform in
//! `[-variance, variance]`, then clamped to what is left.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use super::errors::AdvancedOrderError;
use crate::domain::order_execution::{Order, OrderRequest, OrderSide};
use crate::domain::shared::{AdvancedOrderId, Symbol};

/// Decimal places kept on chunk sizes.
const CHUNK_DP: u32 = 8;

/// Resolution of the variance draw, in steps per unit.
const VARIANCE_STEPS: i64 = 10_000;

/// Iceberg construction parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IcebergParams {
    /// Symbol to trade.
    pub symbol: Symbol,
    /// Order side.
    pub side: OrderSide,
    /// Total quantity to work.
    pub total_amount: Decimal,
    /// Nominal visible quantity.
    pub display_size: Decimal,
    /// Fractional randomisation of the visible size, in `[0, 1)`.
    pub variance: Decimal,
    /// Limit price; chunks are market orders when absent.
    pub price: Option<Decimal>,
    /// Seed for the size draw. Unseeded icebergs draw from the OS.
    pub seed: Option<u64>,
}

impl IcebergParams {
    /// Market iceberg with the default 10% variance.
    #[must_use]
    pub fn new(
        symbol: impl Into<Symbol>,
        side: OrderSide,
        total_amount: Decimal,
        display_size: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            total_amount,
            display_size,
            variance: Decimal::new(1, 1),
            price: None,
            seed: None,
        }
    }

    /// Work the iceberg with limit chunks.
    #[must_use]
    pub const fn with_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    /// Override the size variance.
    #[must_use]
    pub const fn with_variance(mut self, variance: Decimal) -> Self {
        self.variance = variance;
        self
    }

    /// Make the size draw reproducible.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn validate(&self) -> Result<(), AdvancedOrderError> {
        if self.symbol.is_empty() {
            return Err(AdvancedOrderError::invalid("symbol", "symbol must not be empty"));
        }
        if self.total_amount <= Decimal::ZERO {
            return Err(AdvancedOrderError::invalid(
                "total_amount",
                "total amount must be positive",
            ));
        }
        if self.display_size <= Decimal::ZERO {
            return Err(AdvancedOrderError::invalid(
                "display_size",
                "display size must be positive",
            ));
        }
        if self.variance < Decimal::ZERO || self.variance >= Decimal::ONE {
            return Err(AdvancedOrderError::invalid(
                "variance",
                "variance must be in [0, 1)",
            ));
        }
        if self.price.is_some_and(|p| p <= Decimal::ZERO) {
            return Err(AdvancedOrderError::invalid("price", "price must be positive"));
        }
        Ok(())
    }
}

/// Iceberg lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IcebergState {
    /// Chunks still to be worked.
    Active,
    /// Nothing remaining.
    Completed,
    /// Cancelled by the caller.
    Cancelled,
}

impl fmt::Display for IcebergState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Point-in-time view of an iceberg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IcebergStatus {
    /// Lifecycle state.
    pub state: IcebergState,
    /// Total quantity.
    pub total_amount: Decimal,
    /// Quantity not yet filled.
    pub remaining: Decimal,
    /// Size of the next chunk.
    pub current_display: Decimal,
    /// Chunks filled so far.
    pub chunks_executed: u32,
}

/// Iceberg order state machine.
#[derive(Debug, Clone)]
pub struct IcebergOrder {
    id: AdvancedOrderId,
    params: IcebergParams,
    state: IcebergState,
    remaining: Decimal,
    current_display: Decimal,
    chunks_executed: u32,
    rng: StdRng,
}

impl IcebergOrder {
    /// Validate parameters and draw the first visible size.
    pub fn new(id: AdvancedOrderId, params: IcebergParams) -> Result<Self, AdvancedOrderError> {
        params.validate()?;
        let rng = params
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        let mut iceberg = Self {
            id,
            remaining: params.total_amount,
            params,
            state: IcebergState::Active,
            current_display: Decimal::ZERO,
            chunks_executed: 0,
            rng,
        };
        iceberg.redraw_display();
        info!(
            id = %iceberg.id,
            symbol = %iceberg.params.symbol,
            total = %iceberg.params.total_amount,
            display = %iceberg.params.display_size,
            "Iceberg created"
        );
        Ok(iceberg)
    }

    /// Identifier.
    #[must_use]
    pub const fn id(&self) -> &AdvancedOrderId {
        &self.id
    }

    /// Parameters.
    #[must_use]
    pub const fn params(&self) -> &IcebergParams {
        &self.params
    }

    /// Lifecycle state.
    #[must_use]
    pub const fn state(&self) -> IcebergState {
        self.state
    }

    /// Quantity not yet filled.
    #[must_use]
    pub const fn remaining(&self) -> Decimal {
        self.remaining
    }

    /// Size of the next chunk.
    #[must_use]
    pub const fn current_display(&self) -> Decimal {
        self.current_display
    }

    /// Chunks filled so far.
    #[must_use]
    pub const fn chunks_executed(&self) -> u32 {
        self.chunks_executed
    }

    /// Expected number of chunks at the nominal display size.
    #[must_use]
    pub fn total_chunks(&self) -> u64 {
        (self.params.total_amount / self.params.display_size)
            .ceil()
            .to_u64()
            .unwrap_or(u64::MAX)
            .max(1)
    }

    /// True when nothing is left to work.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.remaining <= Decimal::ZERO
    }

    /// The visible chunk to place next, or `None` once complete or cancelled.
    pub fn next_chunk(&self) -> Result<Option<Order>, AdvancedOrderError> {
        if self.state != IcebergState::Active || self.is_complete() {
            return Ok(None);
        }
        let size = self.current_display.min(self.remaining);
        let request = match self.params.price {
            Some(price) => {
                OrderRequest::limit(self.params.symbol.clone(), self.params.side, size, price)
            }
            None => OrderRequest::market(self.params.symbol.clone(), self.params.side, size),
        }
        .with_meta("iceberg_parent", self.id.as_str())
        .with_meta("chunk_number", self.chunks_executed + 1)
        .with_meta("total_chunks", self.total_chunks());
        Ok(Some(Order::new(request)?))
    }

    /// Record a chunk fill and return the following chunk, if any.
    pub fn on_chunk_filled(
        &mut self,
        filled_amount: Decimal,
    ) -> Result<Option<Order>, AdvancedOrderError> {
        if self.state != IcebergState::Active {
            return Err(AdvancedOrderError::state(self.state, "fill"));
        }
        if filled_amount <= Decimal::ZERO {
            return Err(AdvancedOrderError::invalid(
                "filled_amount",
                "filled amount must be positive",
            ));
        }
        if filled_amount > self.remaining {
            return Err(AdvancedOrderError::invalid(
                "filled_amount",
                format!("fill {filled_amount} exceeds remaining {}", self.remaining),
            ));
        }

        self.chunks_executed += 1;
        self.remaining -= filled_amount;
        debug!(
            id = %self.id,
            chunk = self.chunks_executed,
            remaining = %self.remaining,
            "Iceberg chunk filled"
        );

        if self.is_complete() {
            self.state = IcebergState::Completed;
            info!(id = %self.id, chunks = self.chunks_executed, "Iceberg completed");
            return Ok(None);
        }
        self.redraw_display();
        self.next_chunk()
    }

    /// Stop producing chunks. Chunks already placed stay at the venue.
    pub fn cancel(&mut self) -> Result<(), AdvancedOrderError> {
        if self.state != IcebergState::Active {
            return Err(AdvancedOrderError::state(self.state, "cancel"));
        }
        self.state = IcebergState::Cancelled;
        info!(id = %self.id, remaining = %self.remaining, "Iceberg cancelled");
        Ok(())
    }

    /// Status snapshot.
    #[must_use]
    pub fn status(&self) -> IcebergStatus {
        IcebergStatus {
            state: self.state,
            total_amount: self.params.total_amount,
            remaining: self.remaining,
            current_display: self.current_display,
            chunks_executed: self.chunks_executed,
        }
    }

    fn redraw_display(&mut self) {
        let steps = self.rng.random_range(-VARIANCE_STEPS..=VARIANCE_STEPS);
        let jitter = Decimal::new(steps, 4) * self.params.variance;
        let display = (self.params.display_size * (Decimal::ONE + jitter))
            .round_dp_with_strategy(CHUNK_DP, RoundingStrategy::ToZero);
        // Tiny display sizes can round away entirely.
        let display = if display > Decimal::ZERO {
            display
        } else {
            self.params.display_size
        };
        self.current_display = display.min(self.remaining);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn iceberg(total: Decimal, display: Decimal) -> IcebergOrder {
        let params = IcebergParams::new("BTC/USDT", OrderSide::Buy, total, display).with_seed(7);
        IcebergOrder::new(AdvancedOrderId::new("adv-1"), params).unwrap()
    }

    #[test]
    fn display_stays_within_variance_band() {
        let order = iceberg(dec!(1000), dec!(100));
        assert!(order.current_display() >= dec!(90));
        assert!(order.current_display() <= dec!(110));
    }

    #[test]
    fn chunk_carries_parent_tags() {
        let order = iceberg(dec!(1000), dec!(100));
        let chunk = order.next_chunk().unwrap().unwrap();
        assert_eq!(chunk.amount(), order.current_display());
        assert_eq!(chunk.meta("iceberg_parent").unwrap(), "adv-1");
        assert_eq!(chunk.meta("chunk_number").unwrap(), 1);
        assert_eq!(chunk.meta("total_chunks").unwrap(), 10);
    }

    #[test]
    fn fills_drain_to_completion() {
        let mut order = iceberg(dec!(1000), dec!(100));
        let mut chunk = order.next_chunk().unwrap();
        let mut filled = Decimal::ZERO;
        while let Some(c) = chunk {
            filled += c.amount();
            chunk = order.on_chunk_filled(c.amount()).unwrap();
        }
        assert_eq!(filled, dec!(1000));
        assert_eq!(order.state(), IcebergState::Completed);
        assert!(order.next_chunk().unwrap().is_none());
    }

    #[test]
    fn zero_variance_gives_exact_display() {
        let params = IcebergParams::new("ETH/USDT", OrderSide::Sell, dec!(25), dec!(10))
            .with_variance(Decimal::ZERO);
        let mut order = IcebergOrder::new(AdvancedOrderId::generate(), params).unwrap();
        assert_eq!(order.current_display(), dec!(10));
        order.on_chunk_filled(dec!(10)).unwrap();
        let last = order.on_chunk_filled(dec!(10)).unwrap().unwrap();
        assert_eq!(last.amount(), dec!(5));
    }

    #[test]
    fn same_seed_same_sizes() {
        let a = iceberg(dec!(1000), dec!(100));
        let b = iceberg(dec!(1000), dec!(100));
        assert_eq!(a.current_display(), b.current_display());
    }

    #[test]
    fn overfill_rejected() {
        let mut order = iceberg(dec!(10), dec!(5));
        assert!(order.on_chunk_filled(dec!(11)).is_err());
        assert_eq!(order.remaining(), dec!(10));
    }

    #[test]
    fn cancelled_iceberg_stops_chunking() {
        let mut order = iceberg(dec!(10), dec!(5));
        order.cancel().unwrap();
        assert!(order.next_chunk().unwrap().is_none());
        assert!(order.on_chunk_filled(dec!(1)).is_err());
    }

    #[test]
    fn rejects_bad_variance() {
        let params = IcebergParams::new("BTC/USDT", OrderSide::Buy, dec!(10), dec!(1))
            .with_variance(dec!(1));
        assert!(IcebergOrder::new(AdvancedOrderId::generate(), params).is_err());
    }
}
