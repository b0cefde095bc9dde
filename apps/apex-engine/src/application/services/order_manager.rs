//! Order Manager Service
//!
//! Ledger of every order the process created. Working orders live in the
//! active map; terminal orders move to an append-only history and are never
//! mutated again.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::application::ports::{Alert, AlertKind, AlertSeverity, AlertSink, dispatch_alert};
use crate::domain::order_execution::{Order, OrderError, OrderRequest, OrderStatus};
use crate::domain::shared::{OrderId, Symbol, VenueOrderId};

/// Serializable copy of the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLedgerSnapshot {
    /// Working orders.
    pub active: Vec<Order>,
    /// Terminal orders, oldest first.
    pub history: Vec<Order>,
}

/// Ledger counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatistics {
    /// Working orders.
    pub active: usize,
    /// All orders ever tracked.
    pub total: usize,
    /// Count per status label.
    pub by_status: BTreeMap<String, usize>,
    /// Count per side label.
    pub by_side: BTreeMap<String, usize>,
}

#[derive(Debug, Default)]
struct OrderBook {
    active: HashMap<OrderId, Order>,
    history: Vec<Order>,
}

impl OrderBook {
    fn active_mut(&mut self, id: &OrderId) -> Result<&mut Order, OrderError> {
        self.active.get_mut(id).ok_or_else(|| OrderError::NotFound {
            order_id: id.to_string(),
        })
    }

    /// Move the order to history if it reached a terminal status.
    fn settle(&mut self, id: &OrderId) -> Option<Order> {
        let terminal = self.active.get(id).is_some_and(|o| o.status().is_terminal());
        if !terminal {
            return self.active.get(id).cloned();
        }
        let order = self.active.remove(id)?;
        self.history.push(order.clone());
        Some(order)
    }
}

/// Order ledger service.
pub struct OrderManager {
    book: RwLock<OrderBook>,
    alerts: Arc<dyn AlertSink>,
}

impl std::fmt::Debug for OrderManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderManager").finish_non_exhaustive()
    }
}

impl OrderManager {
    /// Create an empty ledger.
    #[must_use]
    pub fn new(alerts: Arc<dyn AlertSink>) -> Self {
        Self {
            book: RwLock::new(OrderBook::default()),
            alerts,
        }
    }

    /// Validate and record a new `PENDING` order.
    pub async fn create_order(&self, request: OrderRequest) -> Result<Order, OrderError> {
        let order = Order::new(request)?;
        info!(
            order_id = %order.id(),
            symbol = %order.symbol(),
            side = %order.side(),
            order_type = %order.order_type(),
            amount = %order.amount(),
            "Order created"
        );
        self.track(order.clone()).await;
        Ok(order)
    }

    /// Record an order built elsewhere, such as an algorithm slice.
    pub async fn track(&self, order: Order) {
        let mut book = self.book.write().await;
        if order.status().is_terminal() {
            book.history.push(order);
        } else {
            book.active.insert(order.id().clone(), order);
        }
    }

    /// Look up an order in the active set, then in history.
    pub async fn get(&self, id: &OrderId) -> Option<Order> {
        let book = self.book.read().await;
        book.active
            .get(id)
            .cloned()
            .or_else(|| book.history.iter().rev().find(|o| o.id() == id).cloned())
    }

    /// Apply a status report from a venue.
    pub async fn update_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
        filled: Option<Decimal>,
        average_price: Option<Decimal>,
        venue_order_id: Option<VenueOrderId>,
    ) -> Result<Order, OrderError> {
        let updated = {
            let mut book = self.book.write().await;
            book.active_mut(id)?
                .apply_report(status, filled, average_price, venue_order_id)?;
            book.settle(id)
        };
        let order = updated.ok_or_else(|| OrderError::NotFound {
            order_id: id.to_string(),
        })?;
        debug!(order_id = %id, status = %status, "Order status updated");
        if status == OrderStatus::Rejected {
            self.alert_rejected(&order).await;
        }
        Ok(order)
    }

    /// Apply a fill, updating the average price incrementally.
    pub async fn apply_fill(
        &self,
        id: &OrderId,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<Order, OrderError> {
        let mut book = self.book.write().await;
        book.active_mut(id)?.apply_fill(quantity, price)?;
        let order = book.settle(id).ok_or_else(|| OrderError::NotFound {
            order_id: id.to_string(),
        })?;
        info!(
            order_id = %id,
            quantity = %quantity,
            price = %price,
            filled = %order.filled(),
            status = %order.status(),
            "Order filled"
        );
        Ok(order)
    }

    /// Cancel a working order.
    pub async fn cancel(&self, id: &OrderId) -> Result<Order, OrderError> {
        let mut book = self.book.write().await;
        if let Some(done) = book.history.iter().rev().find(|o| o.id() == id) {
            return Err(OrderError::InvalidStateTransition {
                from: done.status(),
                to: OrderStatus::Canceled,
            });
        }
        book.active_mut(id)?.cancel()?;
        let order = book.settle(id).ok_or_else(|| OrderError::NotFound {
            order_id: id.to_string(),
        })?;
        info!(order_id = %id, "Order canceled");
        Ok(order)
    }

    /// Reject a working order and raise an order alert.
    pub async fn reject(&self, id: &OrderId, reason: &str) -> Result<Order, OrderError> {
        let order = {
            let mut book = self.book.write().await;
            book.active_mut(id)?.reject(reason)?;
            book.settle(id).ok_or_else(|| OrderError::NotFound {
                order_id: id.to_string(),
            })?
        };
        warn!(order_id = %id, reason, "Order rejected");
        self.alert_rejected(&order).await;
        Ok(order)
    }

    /// Working orders, oldest first, optionally for one symbol.
    pub async fn open_orders(&self, symbol: Option<&Symbol>) -> Vec<Order> {
        let book = self.book.read().await;
        let mut orders: Vec<Order> = book
            .active
            .values()
            .filter(|o| symbol.is_none_or(|s| o.symbol() == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        orders
    }

    /// Terminal orders, newest first, optionally for one symbol.
    pub async fn history(&self, symbol: Option<&Symbol>, limit: usize) -> Vec<Order> {
        let book = self.book.read().await;
        book.history
            .iter()
            .rev()
            .filter(|o| symbol.is_none_or(|s| o.symbol() == s))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Ledger counts.
    pub async fn statistics(&self) -> OrderStatistics {
        let book = self.book.read().await;
        let mut stats = OrderStatistics {
            active: book.active.len(),
            total: book.active.len() + book.history.len(),
            ..OrderStatistics::default()
        };
        for order in book.active.values().chain(book.history.iter()) {
            *stats.by_status.entry(order.status().to_string()).or_default() += 1;
            *stats.by_side.entry(order.side().to_string()).or_default() += 1;
        }
        stats
    }

    /// Copy of the whole ledger.
    pub async fn snapshot(&self) -> OrderLedgerSnapshot {
        let book = self.book.read().await;
        let mut active: Vec<Order> = book.active.values().cloned().collect();
        active.sort_by(|a, b| a.id().cmp(b.id()));
        OrderLedgerSnapshot {
            active,
            history: book.history.clone(),
        }
    }

    /// Replace the ledger with a snapshot.
    pub async fn restore(&self, snapshot: OrderLedgerSnapshot) {
        let mut book = self.book.write().await;
        book.active = snapshot
            .active
            .into_iter()
            .map(|o| (o.id().clone(), o))
            .collect();
        book.history = snapshot.history;
        info!(
            active = book.active.len(),
            history = book.history.len(),
            "Order ledger restored"
        );
    }

    async fn alert_rejected(&self, order: &Order) {
        let reason = order
            .meta("reject_reason")
            .and_then(|v| v.as_str())
            .unwrap_or("rejected by venue")
            .to_string();
        let alert = Alert::new(
            AlertKind::Order,
            AlertSeverity::High,
            "Order rejected",
            format!("Order {} for {} rejected: {reason}", order.id(), order.symbol()),
        )
        .with_symbol(order.symbol().clone())
        .with_data("order_id", order.id().as_str())
        .with_data("venue", order.venue());
        dispatch_alert(self.alerts.as_ref(), alert).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockAlertSink;
    use crate::domain::order_execution::OrderSide;
    use rust_decimal_macros::dec;

    fn quiet_sink() -> Arc<dyn AlertSink> {
        let mut sink = MockAlertSink::new();
        sink.expect_send().returning(|_| Ok(()));
        Arc::new(sink)
    }

    #[tokio::test]
    async fn fills_move_order_to_history() {
        let manager = OrderManager::new(quiet_sink());
        let order = manager
            .create_order(OrderRequest::market("BTC/USDT", OrderSide::Buy, dec!(2)))
            .await
            .unwrap();

        manager.apply_fill(order.id(), dec!(1), dec!(100)).await.unwrap();
        assert_eq!(manager.open_orders(None).await.len(), 1);

        let done = manager.apply_fill(order.id(), dec!(1), dec!(110)).await.unwrap();
        assert_eq!(done.status(), OrderStatus::Filled);
        assert_eq!(done.average_price(), Some(dec!(105)));
        assert!(manager.open_orders(None).await.is_empty());
        assert_eq!(manager.history(None, 10).await.len(), 1);
        assert!(manager.get(order.id()).await.is_some());
    }

    #[tokio::test]
    async fn cancel_twice_is_an_error() {
        let manager = OrderManager::new(quiet_sink());
        let order = manager
            .create_order(OrderRequest::limit("ETH/USDT", OrderSide::Sell, dec!(1), dec!(3000)))
            .await
            .unwrap();
        manager.cancel(order.id()).await.unwrap();
        let err = manager.cancel(order.id()).await.unwrap_err();
        assert!(matches!(err, OrderError::InvalidStateTransition { .. }));
    }

    #[tokio::test]
    async fn rejection_raises_order_alert() {
        let mut sink = MockAlertSink::new();
        sink.expect_send()
            .withf(|a| a.kind == AlertKind::Order && a.message.contains("insufficient"))
            .times(1)
            .returning(|_| Ok(()));
        let manager = OrderManager::new(Arc::new(sink));
        let order = manager
            .create_order(OrderRequest::market("BTC/USDT", OrderSide::Buy, dec!(1)))
            .await
            .unwrap();
        let rejected = manager.reject(order.id(), "insufficient balance").await.unwrap();
        assert_eq!(rejected.status(), OrderStatus::Rejected);
    }

    #[tokio::test]
    async fn history_is_newest_first_and_filtered() {
        let manager = OrderManager::new(quiet_sink());
        for symbol in ["BTC/USDT", "ETH/USDT", "BTC/USDT"] {
            let order = manager
                .create_order(OrderRequest::market(symbol, OrderSide::Buy, dec!(1)))
                .await
                .unwrap();
            manager.cancel(order.id()).await.unwrap();
        }
        let btc = Symbol::new("BTC/USDT");
        assert_eq!(manager.history(Some(&btc), 10).await.len(), 2);
        assert_eq!(manager.history(None, 1).await.len(), 1);

        let stats = manager.statistics().await;
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_status.get("CANCELED"), Some(&3));
    }

    #[tokio::test]
    async fn status_reports_follow_the_lifecycle() {
        let manager = OrderManager::new(quiet_sink());
        let order = manager
            .create_order(OrderRequest::market("BTC/USDT", OrderSide::Buy, dec!(2)))
            .await
            .unwrap();
        manager
            .update_status(order.id(), OrderStatus::Open, None, None, Some(VenueOrderId::new("v-7")))
            .await
            .unwrap();

        let err = manager
            .update_status(order.id(), OrderStatus::Pending, None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidStateTransition { .. }));
        assert_eq!(manager.get(order.id()).await.unwrap().status(), OrderStatus::Open);

        let filled = manager
            .update_status(order.id(), OrderStatus::Filled, None, Some(dec!(100)), None)
            .await
            .unwrap();
        assert_eq!(filled.remaining(), Decimal::ZERO);
        assert!(manager.open_orders(None).await.is_empty());
    }

    #[tokio::test]
    async fn snapshot_restores_ledger() {
        let manager = OrderManager::new(quiet_sink());
        let order = manager
            .create_order(OrderRequest::market("BTC/USDT", OrderSide::Sell, dec!(1)))
            .await
            .unwrap();
        let snapshot = manager.snapshot().await;

        let restored = OrderManager::new(quiet_sink());
        restored.restore(snapshot).await;
        assert_eq!(restored.get(order.id()).await, Some(order));
    }
}
