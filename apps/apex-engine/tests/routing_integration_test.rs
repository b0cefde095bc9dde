//! Smart order router against paper venues.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use rust_decimal_macros::dec;

use apex_engine::application::ports::{AlertKind, AlertSeverity, VenuePort};
use apex_engine::application::services::{RouterSettings, SmartRouter};
use apex_engine::domain::order_execution::{Order, OrderRequest, OrderSide, OrderStatus};
use apex_engine::domain::routing::{RoutingError, RoutingPriority};
use apex_engine::domain::shared::Symbol;
use apex_engine::infrastructure::{InMemoryAlertSink, PaperVenue, SystemClock};

const SYMBOL: &str = "BTC/USDT";

struct Harness {
    router: SmartRouter,
    alerts: Arc<InMemoryAlertSink>,
    cheap: Arc<PaperVenue>,
    middle: Arc<PaperVenue>,
    dear: Arc<PaperVenue>,
}

async fn harness() -> Harness {
    let alerts = Arc::new(InMemoryAlertSink::new());
    let router = SmartRouter::new(
        RouterSettings::default(),
        alerts.clone(),
        Arc::new(SystemClock),
    );

    let cheap = Arc::new(PaperVenue::new("cheap"));
    cheap.set_quote(SYMBOL, dec!(49990), dec!(50000), dec!(900000));
    let middle = Arc::new(PaperVenue::new("middle"));
    middle.set_quote(SYMBOL, dec!(50000), dec!(50010), dec!(800000));
    let dear = Arc::new(PaperVenue::new("dear"));
    dear.set_quote(SYMBOL, dec!(50010), dec!(50020), dec!(700000));

    for venue in [&cheap, &middle, &dear] {
        router
            .register_venue(Arc::clone(venue) as Arc<dyn VenuePort>)
            .await;
    }

    Harness {
        router,
        alerts,
        cheap,
        middle,
        dear,
    }
}

fn market_buy(amount: rust_decimal::Decimal) -> Order {
    Order::new(OrderRequest::market(SYMBOL, OrderSide::Buy, amount)).unwrap()
}

#[tokio::test]
async fn price_priority_picks_lowest_ask() {
    let h = harness().await;
    let decision = h
        .router
        .best_venue(
            &Symbol::new(SYMBOL),
            OrderSide::Buy,
            dec!(1),
            Some(RoutingPriority::Price),
        )
        .await
        .unwrap();

    assert_eq!(decision.venue(), "cheap");
    assert_eq!(decision.scores().len(), 3);
    assert!(decision.failover_from().is_none());
}

#[tokio::test]
async fn routed_market_order_fills_at_best_ask() {
    let h = harness().await;
    let routed = h.router.route(market_buy(dec!(0.5)), None).await.unwrap();

    assert_eq!(routed.decision.venue(), "cheap");
    assert_eq!(routed.order.status(), OrderStatus::Filled);
    assert_eq!(routed.order.average_price(), Some(dec!(50000)));
    assert_eq!(h.cheap.placed_orders().len(), 1);
    assert!(h.middle.placed_orders().is_empty());
}

#[tokio::test]
async fn rejection_fails_over_to_next_ranked_venue() {
    let h = harness().await;
    h.cheap.set_reject_orders(true);

    let routed = h.router.route(market_buy(dec!(1)), None).await.unwrap();

    assert_eq!(routed.decision.venue(), "middle");
    assert_eq!(routed.decision.failover_from(), Some("cheap"));
    assert_eq!(routed.order.average_price(), Some(dec!(50010)));
    assert!(h.alerts.is_empty());
}

#[tokio::test]
async fn all_venues_failing_raises_critical_alert() {
    let h = harness().await;
    for venue in [&h.cheap, &h.middle, &h.dear] {
        venue.set_reject_orders(true);
    }

    let err = h.router.route(market_buy(dec!(1)), None).await.unwrap_err();
    let RoutingError::AllVenuesFailed { attempts, .. } = err else {
        panic!("expected AllVenuesFailed, got {err:?}");
    };
    assert_eq!(attempts, vec!["cheap", "middle", "dear"]);

    let alerts = h.alerts.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, AlertKind::Routing);
    assert_eq!(alerts[0].severity, AlertSeverity::Critical);
}

#[tokio::test]
async fn failing_data_venue_is_skipped_and_decays() {
    let h = harness().await;
    h.cheap.set_fail_data(true);

    let decision = h
        .router
        .best_venue(&Symbol::new(SYMBOL), OrderSide::Buy, dec!(1), None)
        .await
        .unwrap();
    assert_eq!(decision.venue(), "middle");
    assert_eq!(decision.scores().len(), 2);

    let status = h.router.venue_status().await;
    let cheap = status.iter().find(|s| s.name == "cheap").unwrap();
    assert_eq!(cheap.reliability, dec!(0.9));
}

#[tokio::test]
async fn no_quotes_means_no_venues() {
    let h = harness().await;
    let err = h
        .router
        .best_venue(&Symbol::new("ETH/USDT"), OrderSide::Sell, dec!(1), None)
        .await
        .unwrap_err();
    assert!(matches!(err, RoutingError::NoVenuesAvailable { .. }));
}

#[tokio::test]
async fn arbitrage_found_across_venues() {
    let h = harness().await;
    // bid well above every other ask
    h.dear.set_quote(SYMBOL, dec!(51000), dec!(51010), dec!(700000));

    let opportunities = h
        .router
        .arbitrage_opportunities(&Symbol::new(SYMBOL), dec!(0.1))
        .await;

    let best = opportunities.first().unwrap();
    assert_eq!(best.buy_venue, "cheap");
    assert_eq!(best.sell_venue, "dear");
    assert!(best.net_profit_percent > dec!(1.5));
}

#[tokio::test]
async fn unregistered_venue_is_not_routed() {
    let h = harness().await;
    h.router.unregister_venue("cheap").await.unwrap();

    let routed = h.router.route(market_buy(dec!(1)), None).await.unwrap();
    assert_eq!(routed.decision.venue(), "middle");
    assert!(matches!(
        h.router.unregister_venue("cheap").await,
        Err(RoutingError::UnknownVenue { .. })
    ));
}
