//! Ledger, position book and risk state survive a JSON snapshot round trip.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal_macros::dec;
use tempfile::TempDir;

use apex_engine::application::services::{
    OrderLedgerSnapshot, OrderManager, PositionBookSnapshot, PositionTracker, RiskService,
};
use apex_engine::domain::order_execution::{OrderRequest, OrderSide, OrderStatus};
use apex_engine::domain::position_tracking::{ExitReason, OpenPositionParams, PositionSide};
use apex_engine::domain::risk_management::{RiskConfig, RiskManager, RiskSnapshot};
use apex_engine::domain::shared::{Metadata, Symbol};
use apex_engine::infrastructure::{InMemoryAlertSink, JsonSnapshotStore};

fn store() -> (TempDir, JsonSnapshotStore) {
    let dir = TempDir::new().unwrap();
    let store = JsonSnapshotStore::new(dir.path().join("snapshots"));
    (dir, store)
}

fn long(symbol: &str, entry: rust_decimal::Decimal, quantity: rust_decimal::Decimal) -> OpenPositionParams {
    OpenPositionParams {
        symbol: Symbol::new(symbol),
        side: PositionSide::Long,
        entry_price: entry,
        quantity,
        stop_loss: Some(entry * dec!(0.98)),
        take_profit: Some(entry * dec!(1.05)),
        opened_at: Utc::now(),
        metadata: Metadata::new(),
    }
}

#[tokio::test]
async fn order_ledger_round_trip() {
    let (_dir, store) = store();
    let ledger = OrderManager::new(Arc::new(InMemoryAlertSink::new()));

    let open = ledger
        .create_order(OrderRequest::limit("BTC/USDT", OrderSide::Buy, dec!(0.5), dec!(48000)))
        .await
        .unwrap();
    let filled = ledger
        .create_order(OrderRequest::market("ETH/USDT", OrderSide::Sell, dec!(2)))
        .await
        .unwrap();
    ledger.apply_fill(filled.id(), dec!(2), dec!(3000)).await.unwrap();

    store.save("orders", &ledger.snapshot().await).unwrap();
    let loaded: OrderLedgerSnapshot = store.load("orders").unwrap().unwrap();

    let restored = OrderManager::new(Arc::new(InMemoryAlertSink::new()));
    restored.restore(loaded).await;

    assert_eq!(restored.statistics().await, ledger.statistics().await);
    assert_eq!(restored.open_orders(None).await.len(), 1);
    assert_eq!(restored.get(open.id()).await.unwrap().price(), Some(dec!(48000)));
    let done = restored.get(filled.id()).await.unwrap();
    assert_eq!(done.status(), OrderStatus::Filled);
    assert_eq!(done.average_price(), Some(dec!(3000)));
}

#[tokio::test]
async fn position_book_round_trip() {
    let (_dir, store) = store();
    let book = PositionTracker::new();

    let held = book.open_position(long("BTC/USDT", dec!(50000), dec!(0.1))).await.unwrap();
    let closed = book.open_position(long("ETH/USDT", dec!(3000), dec!(1))).await.unwrap();
    book.close_position(closed.id(), dec!(3150), ExitReason::TakeProfit, Utc::now())
        .await
        .unwrap();
    let prices = HashMap::from([(Symbol::new("BTC/USDT"), dec!(51000))]);
    book.update_marks(&prices).await;

    store.save("positions", &book.snapshot().await).unwrap();
    let loaded: PositionBookSnapshot = store.load("positions").unwrap().unwrap();

    let restored = PositionTracker::new();
    restored.restore(loaded).await;

    let pnl = restored.total_pnl().await;
    assert_eq!(pnl, book.total_pnl().await);
    assert_eq!(pnl.realized, dec!(150));
    assert_eq!(pnl.unrealized, dec!(100));
    assert_eq!(restored.open_positions().await.len(), 1);
    assert_eq!(restored.get(held.id()).await.unwrap().entry_price(), dec!(50000));
    assert_eq!(
        restored.portfolio_value(dec!(5000), &prices).await,
        dec!(5000) + dec!(0.1) * dec!(51000)
    );
}

#[tokio::test]
async fn risk_state_round_trip() {
    let (_dir, store) = store();
    let alerts = Arc::new(InMemoryAlertSink::new());
    let risk = RiskService::new(RiskManager::new(RiskConfig::default()), alerts.clone());

    risk.add_risk(&Symbol::new("BTC/USDT"), dec!(200), dec!(10000)).await.unwrap();
    risk.add_risk(&Symbol::new("ETH/USDT"), dec!(100), dec!(10000)).await.unwrap();
    assert!(risk.check_daily_loss(dec!(-600)).await);
    assert_eq!(alerts.len(), 1);

    store.save("risk", &risk.snapshot().await).unwrap();
    let loaded: RiskSnapshot = store.load("risk").unwrap().unwrap();

    let restored = RiskService::new(RiskManager::new(RiskConfig::default()), alerts.clone());
    restored.restore(loaded).await;

    let report = restored.report().await;
    assert_eq!(report, risk.report().await);
    assert_eq!(report.total_risk, dec!(0.03));
    assert!(report.daily_loss_breached);

    // a restored breach does not alert a second time
    assert!(restored.check_daily_loss(dec!(-650)).await);
    assert_eq!(alerts.len(), 1);
}

#[test]
fn missing_snapshot_loads_as_none() {
    let (_dir, store) = store();
    let loaded: Option<RiskSnapshot> = store.load("risk").unwrap();
    assert!(loaded.is_none());
    assert!(!store.remove("risk").unwrap());
}
