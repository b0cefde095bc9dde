//! Smart Order Router
//!
//! Keeps the venue registry with per-venue latency and reliability, ranks
//! venues for each order and fails over down the ranking when placement
//! fails.
//!
//! Market data is collected from all venues concurrently. Health updates and
//! scoring then happen under one write lock so ranking sees a consistent
//! snapshot.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::application::ports::{
    Alert, AlertKind, AlertSeverity, AlertSink, Clock, Fees, Ticker, VenuePort,
    dispatch_alert,
};
use crate::domain::order_execution::{Order, OrderSide, OrderStatus};
use crate::domain::routing::{
    ArbitrageOpportunity, RoutingDecision, RoutingError, RoutingPriority, ScoringParams,
    VenueHealth, VenueQuote, VenueScore, find_arbitrage, rank_venues,
};
use crate::domain::shared::Symbol;
use crate::observability::{
    record_failover, record_route, record_routing_failure, record_venue_fetch_failure,
    update_venue_reliability,
};

/// Router tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterSettings {
    /// Priority used when the caller does not pass one.
    pub default_priority: RoutingPriority,
    /// Latency samples kept per venue.
    pub latency_window: usize,
    /// 24h volume that scores a full 1.0 for liquidity.
    pub liquidity_reference: Decimal,
    /// Reliability multiplier on a failed data fetch.
    pub reliability_decay: Decimal,
    /// Reliability multiplier on a successful placement.
    pub reliability_boost: Decimal,
    /// Lowest reliability a venue can decay to.
    pub reliability_floor: Decimal,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            default_priority: RoutingPriority::Price,
            latency_window: 100,
            liquidity_reference: Decimal::from(1_000_000),
            reliability_decay: Decimal::new(9, 1),
            reliability_boost: Decimal::new(105, 2),
            reliability_floor: Decimal::new(1, 1),
        }
    }
}

/// Health view of one registered venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueStatus {
    /// Venue name.
    pub name: String,
    /// Whether the venue reports a session.
    pub connected: bool,
    /// Reliability score.
    pub reliability: Decimal,
    /// Mean latency over the window in milliseconds.
    pub average_latency_ms: Option<Decimal>,
    /// Latency samples held.
    pub samples: usize,
}

/// An order accepted by a venue together with the decision that placed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedOrder {
    /// Order as returned by the venue.
    pub order: Order,
    /// Decision that selected the venue (annotated on failover).
    pub decision: RoutingDecision,
}

struct VenueEntry {
    venue: Arc<dyn VenuePort>,
    health: VenueHealth,
}

/// Multi-venue smart order router.
pub struct SmartRouter {
    venues: RwLock<BTreeMap<String, VenueEntry>>,
    settings: RouterSettings,
    alerts: Arc<dyn AlertSink>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SmartRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmartRouter")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl SmartRouter {
    /// Create a router with no venues.
    #[must_use]
    pub fn new(settings: RouterSettings, alerts: Arc<dyn AlertSink>, clock: Arc<dyn Clock>) -> Self {
        Self {
            venues: RwLock::new(BTreeMap::new()),
            settings,
            alerts,
            clock,
        }
    }

    /// Router tuning.
    #[must_use]
    pub const fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    /// Register a venue, replacing any venue with the same name.
    pub async fn register_venue(&self, venue: Arc<dyn VenuePort>) {
        let name = venue.name().to_string();
        let entry = VenueEntry {
            venue,
            health: VenueHealth::new(self.settings.latency_window),
        };
        self.venues.write().await.insert(name.clone(), entry);
        info!(venue = %name, "Venue registered");
    }

    /// Remove a venue.
    pub async fn unregister_venue(&self, name: &str) -> Result<(), RoutingError> {
        if self.venues.write().await.remove(name).is_none() {
            return Err(RoutingError::UnknownVenue {
                venue: name.to_string(),
            });
        }
        info!(venue = %name, "Venue unregistered");
        Ok(())
    }

    /// Registered venue names.
    pub async fn venue_names(&self) -> Vec<String> {
        self.venues.read().await.keys().cloned().collect()
    }

    /// Reliability and latency per venue.
    pub async fn venue_status(&self) -> Vec<VenueStatus> {
        self.venues
            .read()
            .await
            .iter()
            .map(|(name, entry)| VenueStatus {
                name: name.clone(),
                connected: entry.venue.is_connected(),
                reliability: entry.health.reliability(),
                average_latency_ms: entry.health.average_latency().map(|d| {
                    Decimal::from(u64::try_from(d.as_micros()).unwrap_or(u64::MAX))
                        / Decimal::ONE_THOUSAND
                }),
                samples: entry.health.sample_count(),
            })
            .collect()
    }

    /// Fresh quotes from every connected venue that answered.
    ///
    /// Venues that fail are skipped and their reliability decayed.
    pub async fn collect_quotes(&self, symbol: &Symbol) -> Vec<VenueQuote> {
        let targets: Vec<(String, Arc<dyn VenuePort>)> = self
            .venues
            .read()
            .await
            .iter()
            .filter(|(_, entry)| entry.venue.is_connected())
            .map(|(name, entry)| (name.clone(), Arc::clone(&entry.venue)))
            .collect();

        let results = join_all(targets.iter().map(|(name, venue)| async move {
            let started = Instant::now();
            let ticker = venue.ticker(symbol).await;
            let latency = started.elapsed();
            let data = match ticker {
                Ok(ticker) => venue.fees().await.map(|fees| (ticker, fees)),
                Err(e) => Err(e),
            };
            (name.as_str(), latency, data)
        }))
        .await;

        let mut venues = self.venues.write().await;
        let mut quotes = Vec::with_capacity(results.len());
        for (name, latency, data) in results {
            let Some(entry) = venues.get_mut(name) else {
                continue;
            };
            match data {
                Ok((ticker, fees)) => {
                    entry.health.record_latency(latency);
                    quotes.push(build_quote(name, &ticker, fees, &entry.health));
                }
                Err(e) => {
                    entry.health.record_failure(
                        self.settings.reliability_decay,
                        self.settings.reliability_floor,
                    );
                    warn!(
                        venue = %name,
                        symbol = %symbol,
                        error = %e,
                        reliability = %entry.health.reliability(),
                        "Venue data fetch failed, skipping"
                    );
                    record_venue_fetch_failure(name);
                }
            }
            update_venue_reliability(name, entry.health.reliability().to_f64().unwrap_or(0.0));
        }
        quotes
    }

    /// Rank venues for an order and select the best.
    pub async fn best_venue(
        &self,
        symbol: &Symbol,
        side: OrderSide,
        amount: Decimal,
        priority: Option<RoutingPriority>,
    ) -> Result<RoutingDecision, RoutingError> {
        let priority = priority.unwrap_or(self.settings.default_priority);
        let quotes = self.collect_quotes(symbol).await;
        let params = ScoringParams {
            liquidity_reference: self.settings.liquidity_reference,
        };
        let scores: Vec<VenueScore> = rank_venues(&quotes, side, priority, &params)
            .into_iter()
            .map(|(quote, score)| VenueScore::from_quote(quote, side, score))
            .collect();

        let Some(decision) = RoutingDecision::select_top(
            symbol.clone(),
            side,
            amount,
            priority,
            scores,
            self.clock.now(),
        ) else {
            error!(symbol = %symbol, "No venues available");
            record_routing_failure(symbol.as_str(), "no_venues");
            return Err(RoutingError::NoVenuesAvailable {
                symbol: symbol.to_string(),
            });
        };

        debug!(
            symbol = %symbol,
            venue = %decision.venue(),
            priority = %priority,
            candidates = decision.scores().len(),
            "Venue selected"
        );
        Ok(decision)
    }

    /// Place `order` on the best venue, failing over down the ranking.
    pub async fn route(
        &self,
        order: Order,
        priority: Option<RoutingPriority>,
    ) -> Result<RoutedOrder, RoutingError> {
        let decision = self
            .best_venue(order.symbol(), order.side(), order.amount(), priority)
            .await?;

        let mut attempts = Vec::with_capacity(decision.scores().len());
        for rank in 0..decision.scores().len() {
            let attempt = if rank == 0 {
                decision.clone()
            } else {
                match decision.failover_to(rank, self.clock.now()) {
                    Some(next) => next,
                    None => break,
                }
            };
            let venue_name = attempt.venue().to_string();
            attempts.push(venue_name.clone());

            let Some(venue) = self.venue(&venue_name).await else {
                warn!(venue = %venue_name, "Venue unregistered during routing");
                continue;
            };

            let mut child = order.clone();
            child.assign_venue(venue_name.as_str());
            let started = Instant::now();
            let result = venue.place_order(child).await;
            let elapsed = started.elapsed().as_secs_f64();

            match result {
                Ok(placed) if placed.status() != OrderStatus::Rejected => {
                    self.record_placement_success(&venue_name).await;
                    if rank > 0 {
                        info!(
                            order_id = %placed.id(),
                            venue = %venue_name,
                            from = %decision.venue(),
                            "Failover successful"
                        );
                        record_failover(decision.venue(), &venue_name);
                    } else {
                        info!(order_id = %placed.id(), venue = %venue_name, "Order routed");
                    }
                    record_route(
                        &venue_name,
                        &attempt.priority().to_string(),
                        rank > 0,
                        elapsed,
                    );
                    return Ok(RoutedOrder {
                        order: placed,
                        decision: attempt,
                    });
                }
                Ok(rejected) => {
                    let reason = rejected
                        .meta("reject_reason")
                        .and_then(|v| v.as_str())
                        .unwrap_or("rejected")
                        .to_string();
                    error!(
                        order_id = %order.id(),
                        venue = %venue_name,
                        reason = %reason,
                        "Order rejected by venue"
                    );
                }
                Err(e) => {
                    error!(
                        order_id = %order.id(),
                        venue = %venue_name,
                        error = %e,
                        "Order placement failed"
                    );
                }
            }
        }

        self.fail_all(&order, attempts).await
    }

    /// Cross-venue price gaps whose net profit exceeds `min_profit_percent`.
    pub async fn arbitrage_opportunities(
        &self,
        symbol: &Symbol,
        min_profit_percent: Decimal,
    ) -> Vec<ArbitrageOpportunity> {
        let quotes = self.collect_quotes(symbol).await;
        find_arbitrage(symbol, &quotes, min_profit_percent)
    }

    async fn venue(&self, name: &str) -> Option<Arc<dyn VenuePort>> {
        self.venues
            .read()
            .await
            .get(name)
            .map(|entry| Arc::clone(&entry.venue))
    }

    async fn record_placement_success(&self, name: &str) {
        if let Some(entry) = self.venues.write().await.get_mut(name) {
            entry.health.record_success(self.settings.reliability_boost);
            update_venue_reliability(name, entry.health.reliability().to_f64().unwrap_or(0.0));
        }
    }

    async fn fail_all(
        &self,
        order: &Order,
        attempts: Vec<String>,
    ) -> Result<RoutedOrder, RoutingError> {
        error!(
            order_id = %order.id(),
            symbol = %order.symbol(),
            attempts = ?attempts,
            "Order failed on all venues"
        );
        record_routing_failure(order.symbol().as_str(), "all_failed");
        let alert = Alert::new(
            AlertKind::Routing,
            AlertSeverity::Critical,
            "Routing failed on all venues",
            format!(
                "Order {} for {} {} failed on: {}",
                order.id(),
                order.amount(),
                order.symbol(),
                attempts.join(", ")
            ),
        )
        .with_symbol(order.symbol().clone())
        .with_data("order_id", order.id().as_str())
        .with_data("attempts", attempts.clone());
        dispatch_alert(self.alerts.as_ref(), alert).await;

        Err(RoutingError::AllVenuesFailed {
            symbol: order.symbol().to_string(),
            attempts,
        })
    }
}

fn build_quote(name: &str, ticker: &Ticker, fees: Fees, health: &VenueHealth) -> VenueQuote {
    VenueQuote {
        venue: name.to_string(),
        bid: ticker.bid,
        ask: ticker.ask,
        last: ticker.last,
        volume: ticker.volume,
        maker_fee: fees.maker,
        taker_fee: fees.taker,
        average_latency: health.average_latency(),
        reliability: health.reliability(),
    }
}
