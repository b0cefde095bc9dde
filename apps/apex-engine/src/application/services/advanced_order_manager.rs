//! Advanced Order Manager
//!
//! Passive registry of iceberg, trailing-stop and bracket orders keyed by a
//! generated id. The market monitor feeds it fresh prices; everything else
//! is driven by the caller reporting fills.
//!
//! Orders that finish (filled, fired or cancelled) leave the active set and
//! are kept in a bounded archive so their final status stays queryable.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::advanced_orders::{
    AdvancedOrder, AdvancedOrderError, AdvancedOrderStatus, BracketOrder, BracketParams,
    IcebergOrder, IcebergParams, TrailingStop, TrailingStopParams,
};
use crate::domain::order_execution::Order;
use crate::domain::shared::{AdvancedOrderId, OrderId, Symbol};
use crate::observability::record_trailing_stop_triggered;

/// Finished orders kept for status queries.
pub const FINISHED_ORDER_HISTORY: usize = 1_000;

#[derive(Debug, Default)]
struct Registry {
    active: BTreeMap<AdvancedOrderId, AdvancedOrder>,
    finished: VecDeque<AdvancedOrder>,
}

impl Registry {
    fn find(&self, id: &AdvancedOrderId) -> Option<&AdvancedOrder> {
        self.active
            .get(id)
            .or_else(|| self.finished.iter().rev().find(|order| order.id() == id))
    }

    /// Active order for `action`, or the error a finished or unknown id gets.
    fn active_mut(
        &mut self,
        id: &AdvancedOrderId,
        action: &'static str,
    ) -> Result<&mut AdvancedOrder, AdvancedOrderError> {
        if !self.active.contains_key(id) {
            return Err(self
                .finished
                .iter()
                .rev()
                .find(|order| order.id() == id)
                .map_or_else(
                    || not_found(id),
                    |order| AdvancedOrderError::state(order.state_label(), action),
                ));
        }
        self.active.get_mut(id).ok_or_else(|| not_found(id))
    }

    /// Move `id` to the archive once it can no longer act.
    fn settle(&mut self, id: &AdvancedOrderId) {
        if self.active.get(id).is_some_and(AdvancedOrder::is_active) {
            return;
        }
        let Some(order) = self.active.remove(id) else {
            return;
        };
        debug!(id = %id, kind = order.kind(), state = %order.state_label(), "Advanced order archived");
        if self.finished.len() == FINISHED_ORDER_HISTORY {
            self.finished.pop_front();
        }
        self.finished.push_back(order);
    }
}

/// Registry of advanced orders.
#[derive(Debug, Default)]
pub struct AdvancedOrderManager {
    orders: Mutex<Registry>,
}

impl AdvancedOrderManager {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an iceberg and return its first chunk.
    pub async fn create_iceberg(
        &self,
        params: IcebergParams,
    ) -> Result<(AdvancedOrderId, Option<Order>), AdvancedOrderError> {
        let id = AdvancedOrderId::generate();
        let iceberg = IcebergOrder::new(id.clone(), params)?;
        let first = iceberg.next_chunk()?;
        self.orders
            .lock()
            .await
            .active
            .insert(id.clone(), AdvancedOrder::Iceberg(iceberg));
        Ok((id, first))
    }

    /// Register a trailing stop. It arms on the first price it sees.
    pub async fn create_trailing_stop(
        &self,
        params: TrailingStopParams,
    ) -> Result<AdvancedOrderId, AdvancedOrderError> {
        let id = AdvancedOrderId::generate();
        let stop = TrailingStop::new(id.clone(), params)?;
        info!(id = %id, symbol = %stop.symbol(), "Trailing stop created");
        self.orders
            .lock()
            .await
            .active
            .insert(id.clone(), AdvancedOrder::TrailingStop(stop));
        Ok(id)
    }

    /// Register a bracket and return its entry order.
    pub async fn create_bracket(
        &self,
        params: BracketParams,
    ) -> Result<(AdvancedOrderId, Order), AdvancedOrderError> {
        let id = AdvancedOrderId::generate();
        let bracket = BracketOrder::new(id.clone(), params)?;
        let entry = bracket.entry_order().clone();
        self.orders
            .lock()
            .await
            .active
            .insert(id.clone(), AdvancedOrder::Bracket(bracket));
        Ok((id, entry))
    }

    /// Copy of one order, active or archived.
    pub async fn get(&self, id: &AdvancedOrderId) -> Option<AdvancedOrder> {
        self.orders.lock().await.find(id).cloned()
    }

    /// Status of one order, active or archived.
    pub async fn status(&self, id: &AdvancedOrderId) -> Option<AdvancedOrderStatus> {
        self.orders.lock().await.find(id).map(AdvancedOrder::status)
    }

    /// Status of every active order.
    pub async fn status_all(&self) -> Vec<AdvancedOrderStatus> {
        self.orders
            .lock()
            .await
            .active
            .values()
            .map(AdvancedOrder::status)
            .collect()
    }

    /// Archived orders, oldest first.
    pub async fn finished(&self) -> Vec<AdvancedOrderStatus> {
        self.orders
            .lock()
            .await
            .finished
            .iter()
            .map(AdvancedOrder::status)
            .collect()
    }

    /// Cooperative cancel. Child orders already placed stay at the venue.
    pub async fn cancel(&self, id: &AdvancedOrderId) -> Result<(), AdvancedOrderError> {
        let mut registry = self.orders.lock().await;
        let order = registry.active_mut(id, "cancel")?;
        order.cancel()?;
        info!(id = %id, kind = order.kind(), "Advanced order cancelled");
        registry.settle(id);
        Ok(())
    }

    /// Symbols with a trailing stop still watching prices.
    pub async fn trailing_symbols(&self) -> BTreeSet<Symbol> {
        self.orders
            .lock()
            .await
            .active
            .values()
            .filter_map(|order| match order {
                AdvancedOrder::TrailingStop(stop) if stop.is_active() => {
                    Some(stop.symbol().clone())
                }
                _ => None,
            })
            .collect()
    }

    /// Feed marks into every active trailing stop and collect triggered orders.
    ///
    /// Stops whose symbol has no mark in `prices` are left untouched.
    pub async fn update_trailing_stops(&self, prices: &HashMap<Symbol, Decimal>) -> Vec<Order> {
        let mut registry = self.orders.lock().await;
        let mut triggered = Vec::new();
        let mut fired = Vec::new();
        for order in registry.active.values_mut() {
            let AdvancedOrder::TrailingStop(stop) = order else {
                continue;
            };
            if !stop.is_active() {
                continue;
            }
            let Some(price) = prices.get(stop.symbol()) else {
                continue;
            };
            match stop.update_price(*price) {
                Ok(Some(order)) => {
                    record_trailing_stop_triggered(stop.symbol().as_str());
                    fired.push(stop.id().clone());
                    triggered.push(order);
                }
                Ok(None) => {}
                Err(e) => warn!(id = %stop.id(), error = %e, "Trailing stop update failed"),
            }
        }
        for id in &fired {
            registry.settle(id);
        }
        triggered
    }

    /// Record an iceberg chunk fill and return the next chunk, if any.
    pub async fn on_iceberg_chunk_filled(
        &self,
        id: &AdvancedOrderId,
        filled_amount: Decimal,
    ) -> Result<Option<Order>, AdvancedOrderError> {
        let mut registry = self.orders.lock().await;
        let next = match registry.active_mut(id, "record a fill for")? {
            AdvancedOrder::Iceberg(iceberg) => iceberg.on_chunk_filled(filled_amount)?,
            _ => return Err(wrong_kind(id, "iceberg")),
        };
        registry.settle(id);
        Ok(next)
    }

    /// Entry filled: return the two protective legs for submission.
    pub async fn on_bracket_entry_filled(
        &self,
        id: &AdvancedOrderId,
    ) -> Result<[Order; 2], AdvancedOrderError> {
        let mut registry = self.orders.lock().await;
        match registry.active_mut(id, "fill the entry of")? {
            AdvancedOrder::Bracket(bracket) => bracket.on_entry_filled(),
            _ => Err(wrong_kind(id, "bracket")),
        }
    }

    /// A protective leg filled: return the other leg for cancellation.
    pub async fn on_bracket_exit_filled(
        &self,
        id: &AdvancedOrderId,
        filled: &OrderId,
    ) -> Result<Order, AdvancedOrderError> {
        let mut registry = self.orders.lock().await;
        let other = match registry.active_mut(id, "fill an exit of")? {
            AdvancedOrder::Bracket(bracket) => bracket.on_exit_filled(filled)?,
            _ => return Err(wrong_kind(id, "bracket")),
        };
        registry.settle(id);
        Ok(other)
    }

    /// Number of orders that can still act.
    pub async fn active_count(&self) -> usize {
        self.orders.lock().await.active.len()
    }
}

fn not_found(id: &AdvancedOrderId) -> AdvancedOrderError {
    AdvancedOrderError::NotFound { id: id.to_string() }
}

fn wrong_kind(id: &AdvancedOrderId, expected: &'static str) -> AdvancedOrderError {
    AdvancedOrderError::WrongKind {
        id: id.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::advanced_orders::{AdvancedOrderDetail, TrailSpec, TrailingState};
    use crate::domain::order_execution::OrderSide;
    use rust_decimal_macros::dec;

    fn sell_stop(symbol: &str, trail: Decimal) -> TrailingStopParams {
        TrailingStopParams {
            symbol: Symbol::new(symbol),
            side: OrderSide::Sell,
            amount: dec!(1),
            trail: TrailSpec::Amount(trail),
        }
    }

    fn prices(entries: &[(&str, Decimal)]) -> HashMap<Symbol, Decimal> {
        entries
            .iter()
            .map(|(symbol, price)| (Symbol::new(*symbol), *price))
            .collect()
    }

    #[tokio::test]
    async fn trailing_stop_fires_through_manager() {
        let manager = AdvancedOrderManager::new();
        let id = manager
            .create_trailing_stop(sell_stop("BTC/USDT", dec!(100)))
            .await
            .unwrap();

        assert!(manager.update_trailing_stops(&prices(&[("BTC/USDT", dec!(1000))])).await.is_empty());
        assert!(manager.update_trailing_stops(&prices(&[("BTC/USDT", dec!(1200))])).await.is_empty());
        let fired = manager
            .update_trailing_stops(&prices(&[("BTC/USDT", dec!(1100))]))
            .await;

        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].side(), OrderSide::Sell);
        assert!(manager.trailing_symbols().await.is_empty());
        let status = manager.status(&id).await.unwrap();
        match status.detail {
            AdvancedOrderDetail::TrailingStop(s) => assert_eq!(s.state, TrailingState::Triggered),
            other => panic!("unexpected detail {other:?}"),
        }
    }

    #[tokio::test]
    async fn stops_without_marks_are_untouched() {
        let manager = AdvancedOrderManager::new();
        manager
            .create_trailing_stop(sell_stop("ETH/USDT", dec!(10)))
            .await
            .unwrap();

        let fired = manager
            .update_trailing_stops(&prices(&[("BTC/USDT", dec!(1000))]))
            .await;

        assert!(fired.is_empty());
        assert_eq!(manager.trailing_symbols().await.len(), 1);
    }

    #[tokio::test]
    async fn iceberg_chunks_until_complete() {
        let manager = AdvancedOrderManager::new();
        let params = IcebergParams::new("BTC/USDT", OrderSide::Buy, dec!(10), dec!(4))
            .with_variance(Decimal::ZERO);
        let (id, first) = manager.create_iceberg(params).await.unwrap();
        assert_eq!(first.unwrap().amount(), dec!(4));

        let second = manager.on_iceberg_chunk_filled(&id, dec!(4)).await.unwrap();
        assert_eq!(second.unwrap().amount(), dec!(4));
        let third = manager.on_iceberg_chunk_filled(&id, dec!(4)).await.unwrap();
        assert_eq!(third.unwrap().amount(), dec!(2));
        assert!(manager.on_iceberg_chunk_filled(&id, dec!(2)).await.unwrap().is_none());
        assert_eq!(manager.active_count().await, 0);
    }

    #[tokio::test]
    async fn bracket_flow_returns_other_leg() {
        let manager = AdvancedOrderManager::new();
        let (id, entry) = manager
            .create_bracket(BracketParams {
                symbol: Symbol::new("BTC/USDT"),
                side: OrderSide::Buy,
                amount: dec!(1),
                entry_price: Some(dec!(100)),
                stop_loss_price: dec!(95),
                take_profit_price: dec!(110),
            })
            .await
            .unwrap();
        assert_eq!(entry.price(), Some(dec!(100)));

        let [stop, target] = manager.on_bracket_entry_filled(&id).await.unwrap();
        let cancel = manager.on_bracket_exit_filled(&id, stop.id()).await.unwrap();
        assert_eq!(cancel.id(), target.id());
    }

    #[tokio::test]
    async fn wrong_kind_and_missing_ids_are_errors() {
        let manager = AdvancedOrderManager::new();
        let id = manager
            .create_trailing_stop(sell_stop("BTC/USDT", dec!(5)))
            .await
            .unwrap();

        assert!(matches!(
            manager.on_iceberg_chunk_filled(&id, dec!(1)).await,
            Err(AdvancedOrderError::WrongKind { expected: "iceberg", .. })
        ));
        assert!(matches!(
            manager.cancel(&AdvancedOrderId::new("missing")).await,
            Err(AdvancedOrderError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn cancelled_stop_stops_watching() {
        let manager = AdvancedOrderManager::new();
        let id = manager
            .create_trailing_stop(sell_stop("BTC/USDT", dec!(5)))
            .await
            .unwrap();

        manager.cancel(&id).await.unwrap();

        assert!(manager.trailing_symbols().await.is_empty());
        assert!(manager.cancel(&id).await.is_err());
    }

    #[tokio::test]
    async fn finished_orders_leave_the_active_set() {
        let manager = AdvancedOrderManager::new();
        let cancelled = manager
            .create_trailing_stop(sell_stop("BTC/USDT", dec!(5)))
            .await
            .unwrap();
        let fired = manager
            .create_trailing_stop(sell_stop("ETH/USDT", dec!(5)))
            .await
            .unwrap();

        manager.cancel(&cancelled).await.unwrap();
        manager.update_trailing_stops(&prices(&[("ETH/USDT", dec!(100))])).await;
        assert_eq!(manager.update_trailing_stops(&prices(&[("ETH/USDT", dec!(90))])).await.len(), 1);

        assert_eq!(manager.active_count().await, 0);
        assert!(manager.status_all().await.is_empty());
        let archived: Vec<_> = manager.finished().await.into_iter().map(|s| s.id).collect();
        assert_eq!(archived, vec![cancelled.clone(), fired]);
        assert!(manager.status(&cancelled).await.is_some());
        assert!(matches!(
            manager.cancel(&cancelled).await,
            Err(AdvancedOrderError::InvalidState { action: "cancel", .. })
        ));
    }

    #[tokio::test]
    async fn archive_is_bounded() {
        let manager = AdvancedOrderManager::new();
        let mut first = None;
        for _ in 0..=FINISHED_ORDER_HISTORY {
            let id = manager
                .create_trailing_stop(sell_stop("BTC/USDT", dec!(5)))
                .await
                .unwrap();
            manager.cancel(&id).await.unwrap();
            first.get_or_insert(id);
        }

        assert_eq!(manager.finished().await.len(), FINISHED_ORDER_HISTORY);
        assert!(manager.status(&first.unwrap()).await.is_none());
    }
}
