//! Trailing Stop
//!
//! A SELL trailing stop follows the running high at a fixed distance and
//! fires when price falls to the stop. A BUY trailing stop mirrors this
//! against the running low. The stop only moves in the favorable direction
//! and fires once.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use super::errors::AdvancedOrderError;
use crate::domain::order_execution::{Order, OrderRequest, OrderSide};
use crate::domain::shared::{AdvancedOrderId, Symbol};

/// Distance between the running extreme and the stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TrailSpec {
    /// Absolute price distance.
    Amount(Decimal),
    /// Percentage of the running extreme, e.g. `2` for 2%.
    Percent(Decimal),
}

impl TrailSpec {
    /// Build from the two optional forms; exactly one must be given.
    pub fn from_options(
        amount: Option<Decimal>,
        percent: Option<Decimal>,
    ) -> Result<Self, AdvancedOrderError> {
        let spec = match (amount, percent) {
            (Some(a), None) => Self::Amount(a),
            (None, Some(p)) => Self::Percent(p),
            (None, None) => return Err(trail_error("either trail amount or trail percent is required")),
            (Some(_), Some(_)) => {
                return Err(trail_error("trail amount and trail percent are mutually exclusive"));
            }
        };
        spec.validate()?;
        Ok(spec)
    }

    fn validate(self) -> Result<(), AdvancedOrderError> {
        match self {
            Self::Amount(a) if a <= Decimal::ZERO => Err(trail_error("trail amount must be positive")),
            Self::Percent(p) if p <= Decimal::ZERO || p >= Decimal::ONE_HUNDRED => {
                Err(trail_error("trail percent must be in (0, 100)"))
            }
            _ => Ok(()),
        }
    }

    fn below(self, reference: Decimal) -> Decimal {
        match self {
            Self::Amount(a) => reference - a,
            Self::Percent(p) => reference * (Decimal::ONE - p / Decimal::ONE_HUNDRED),
        }
    }

    fn above(self, reference: Decimal) -> Decimal {
        match self {
            Self::Amount(a) => reference + a,
            Self::Percent(p) => reference * (Decimal::ONE + p / Decimal::ONE_HUNDRED),
        }
    }
}

fn trail_error(message: &str) -> AdvancedOrderError {
    AdvancedOrderError::InvalidTrail {
        message: message.to_string(),
    }
}

/// Trailing stop construction parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailingStopParams {
    /// Symbol to watch.
    pub symbol: Symbol,
    /// SELL protects a long, BUY protects a short or enters on strength.
    pub side: OrderSide,
    /// Quantity of the market order emitted on trigger.
    pub amount: Decimal,
    /// Trail distance.
    pub trail: TrailSpec,
}

/// Trailing stop lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailingState {
    /// Waiting for the first price.
    Uninitialized,
    /// Tracking prices.
    Armed,
    /// Fired; the trail is consumed.
    Triggered,
    /// Cancelled by the caller.
    Cancelled,
}

impl TrailingState {
    /// True once the stop can no longer fire.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Triggered | Self::Cancelled)
    }
}

impl fmt::Display for TrailingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Armed => write!(f, "armed"),
            Self::Triggered => write!(f, "triggered"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Point-in-time view of a trailing stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailingStopStatus {
    /// Lifecycle state.
    pub state: TrailingState,
    /// Current stop level.
    pub stop_price: Option<Decimal>,
    /// Running high (SELL stops).
    pub highest_price: Option<Decimal>,
    /// Running low (BUY stops).
    pub lowest_price: Option<Decimal>,
    /// Trail distance.
    pub trail: TrailSpec,
}

/// Trailing stop state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailingStop {
    id: AdvancedOrderId,
    params: TrailingStopParams,
    state: TrailingState,
    stop_price: Option<Decimal>,
    highest: Option<Decimal>,
    lowest: Option<Decimal>,
}

impl TrailingStop {
    /// Validate parameters. The stop arms on the first price update.
    pub fn new(
        id: AdvancedOrderId,
        params: TrailingStopParams,
    ) -> Result<Self, AdvancedOrderError> {
        if params.symbol.is_empty() {
            return Err(AdvancedOrderError::invalid("symbol", "symbol must not be empty"));
        }
        if params.amount <= Decimal::ZERO {
            return Err(AdvancedOrderError::invalid("amount", "amount must be positive"));
        }
        params.trail.validate()?;
        Ok(Self {
            id,
            params,
            state: TrailingState::Uninitialized,
            stop_price: None,
            highest: None,
            lowest: None,
        })
    }

    /// Identifier.
    #[must_use]
    pub const fn id(&self) -> &AdvancedOrderId {
        &self.id
    }

    /// Parameters.
    #[must_use]
    pub const fn params(&self) -> &TrailingStopParams {
        &self.params
    }

    /// Watched symbol.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.params.symbol
    }

    /// Lifecycle state.
    #[must_use]
    pub const fn state(&self) -> TrailingState {
        self.state
    }

    /// Current stop level, once armed.
    #[must_use]
    pub const fn stop_price(&self) -> Option<Decimal> {
        self.stop_price
    }

    /// True while the stop is tracking prices or waiting to arm.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.state.is_terminal()
    }

    /// Feed a mark price. Returns the market order to send when the stop fires.
    pub fn update_price(&mut self, price: Decimal) -> Result<Option<Order>, AdvancedOrderError> {
        if price <= Decimal::ZERO {
            return Err(AdvancedOrderError::invalid("price", "price must be positive"));
        }
        match self.state {
            TrailingState::Triggered | TrailingState::Cancelled => Ok(None),
            TrailingState::Uninitialized => {
                self.arm(price);
                Ok(None)
            }
            TrailingState::Armed => self.track(price),
        }
    }

    /// Disarm without firing.
    pub fn cancel(&mut self) -> Result<(), AdvancedOrderError> {
        if self.state.is_terminal() {
            return Err(AdvancedOrderError::state(self.state, "cancel"));
        }
        self.state = TrailingState::Cancelled;
        info!(id = %self.id, "Trailing stop cancelled");
        Ok(())
    }

    /// Status snapshot.
    #[must_use]
    pub fn status(&self) -> TrailingStopStatus {
        let (highest_price, lowest_price) = match self.params.side {
            OrderSide::Sell => (self.highest, None),
            OrderSide::Buy => (None, self.lowest),
        };
        TrailingStopStatus {
            state: self.state,
            stop_price: self.stop_price,
            highest_price,
            lowest_price,
            trail: self.params.trail,
        }
    }

    fn arm(&mut self, price: Decimal) {
        self.highest = Some(price);
        self.lowest = Some(price);
        self.stop_price = Some(self.level_for(price));
        self.state = TrailingState::Armed;
        info!(
            id = %self.id,
            symbol = %self.params.symbol,
            price = %price,
            stop = ?self.stop_price,
            "Trailing stop armed"
        );
    }

    fn track(&mut self, price: Decimal) -> Result<Option<Order>, AdvancedOrderError> {
        let triggered = match self.params.side {
            OrderSide::Sell => {
                if self.highest.is_none_or(|high| price > high) {
                    self.highest = Some(price);
                    self.ratchet(price);
                }
                self.stop_price.is_some_and(|stop| price <= stop)
            }
            OrderSide::Buy => {
                if self.lowest.is_none_or(|low| price < low) {
                    self.lowest = Some(price);
                    self.ratchet(price);
                }
                self.stop_price.is_some_and(|stop| price >= stop)
            }
        };
        if triggered {
            self.fire(price).map(Some)
        } else {
            Ok(None)
        }
    }

    fn ratchet(&mut self, extreme: Decimal) {
        let candidate = self.level_for(extreme);
        let moved = match (self.params.side, self.stop_price) {
            (_, None) => true,
            (OrderSide::Sell, Some(stop)) => candidate > stop,
            (OrderSide::Buy, Some(stop)) => candidate < stop,
        };
        if moved {
            debug!(id = %self.id, stop = %candidate, "Trailing stop moved");
            self.stop_price = Some(candidate);
        }
    }

    fn level_for(&self, extreme: Decimal) -> Decimal {
        match self.params.side {
            OrderSide::Sell => self.params.trail.below(extreme),
            OrderSide::Buy => self.params.trail.above(extreme),
        }
    }

    fn fire(&mut self, price: Decimal) -> Result<Order, AdvancedOrderError> {
        let mut request =
            OrderRequest::market(self.params.symbol.clone(), self.params.side, self.params.amount)
                .with_meta("trailing_stop_triggered", true)
                .with_meta("trailing_parent", self.id.as_str());
        if let Some(stop) = self.stop_price {
            request = request.with_meta("stop_price", stop.to_string());
        }
        request = match self.params.side {
            OrderSide::Sell => request.with_meta(
                "highest_price",
                self.highest.map(|h| h.to_string()),
            ),
            OrderSide::Buy => request.with_meta(
                "lowest_price",
                self.lowest.map(|l| l.to_string()),
            ),
        };
        let order = Order::new(request)?;
        self.state = TrailingState::Triggered;
        info!(
            id = %self.id,
            symbol = %self.params.symbol,
            price = %price,
            stop = ?self.stop_price,
            "Trailing stop triggered"
        );
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::OrderType;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn stop(side: OrderSide, trail: TrailSpec) -> TrailingStop {
        TrailingStop::new(
            AdvancedOrderId::new("adv-ts"),
            TrailingStopParams {
                symbol: Symbol::from("BTC/USDT"),
                side,
                amount: dec!(1),
                trail,
            },
        )
        .unwrap()
    }

    #[test]
    fn trail_spec_requires_exactly_one() {
        assert!(TrailSpec::from_options(None, None).is_err());
        assert!(TrailSpec::from_options(Some(dec!(5)), Some(dec!(1))).is_err());
        assert!(TrailSpec::from_options(Some(dec!(0)), None).is_err());
        assert_eq!(
            TrailSpec::from_options(None, Some(dec!(2))).unwrap(),
            TrailSpec::Percent(dec!(2))
        );
    }

    #[test]
    fn sell_stop_follows_high_and_fires() {
        let mut ts = stop(OrderSide::Sell, TrailSpec::Amount(dec!(5)));
        assert!(ts.update_price(dec!(100)).unwrap().is_none());
        assert_eq!(ts.stop_price(), Some(dec!(95)));

        assert!(ts.update_price(dec!(105)).unwrap().is_none());
        assert_eq!(ts.stop_price(), Some(dec!(100)));

        assert!(ts.update_price(dec!(102)).unwrap().is_none());
        assert_eq!(ts.stop_price(), Some(dec!(100)));

        let order = ts.update_price(dec!(100)).unwrap().unwrap();
        assert_eq!(order.order_type(), OrderType::Market);
        assert_eq!(order.side(), OrderSide::Sell);
        assert_eq!(order.meta("stop_price").unwrap(), "100");
        assert_eq!(ts.state(), TrailingState::Triggered);

        assert!(ts.update_price(dec!(90)).unwrap().is_none());
    }

    #[test]
    fn buy_stop_follows_low_by_percent() {
        let mut ts = stop(OrderSide::Buy, TrailSpec::Percent(dec!(10)));
        ts.update_price(dec!(100)).unwrap();
        assert_eq!(ts.stop_price(), Some(dec!(110)));
        ts.update_price(dec!(80)).unwrap();
        assert_eq!(ts.stop_price(), Some(dec!(88)));
        assert!(ts.update_price(dec!(87)).unwrap().is_none());
        let order = ts.update_price(dec!(88)).unwrap().unwrap();
        assert_eq!(order.side(), OrderSide::Buy);
        assert_eq!(order.meta("lowest_price").unwrap(), "80");
    }

    #[test]
    fn cancelled_stop_never_fires() {
        let mut ts = stop(OrderSide::Sell, TrailSpec::Amount(dec!(1)));
        ts.update_price(dec!(10)).unwrap();
        ts.cancel().unwrap();
        assert!(ts.update_price(dec!(1)).unwrap().is_none());
        assert!(ts.cancel().is_err());
    }

    proptest! {
        #[test]
        fn sell_stop_never_retraces(prices in prop::collection::vec(1u32..10_000, 1..60)) {
            let mut ts = stop(OrderSide::Sell, TrailSpec::Percent(dec!(3)));
            let mut last: Option<Decimal> = None;
            for p in prices {
                if ts.update_price(Decimal::from(p)).unwrap().is_some() {
                    break;
                }
                let current = ts.stop_price();
                if let (Some(prev), Some(now)) = (last, current) {
                    prop_assert!(now >= prev);
                }
                last = current;
            }
        }

        #[test]
        fn buy_stop_never_retraces(prices in prop::collection::vec(1u32..10_000, 1..60)) {
            let mut ts = stop(OrderSide::Buy, TrailSpec::Amount(dec!(25)));
            let mut last: Option<Decimal> = None;
            for p in prices {
                if ts.update_price(Decimal::from(p)).unwrap().is_some() {
                    break;
                }
                let current = ts.stop_price();
                if let (Some(prev), Some(now)) = (last, current) {
                    prop_assert!(now <= prev);
                }
                last = current;
            }
        }
    }
}
