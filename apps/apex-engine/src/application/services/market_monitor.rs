//! Market Monitor
//!
//! The single timer source for periodic work. Each tick feeds fresh marks
//! into trailing stops, samples venue volume for running POV executions,
//! collects TWAP/VWAP slices that have come due and rolls the risk day
//! over at UTC midnight.
//!
//! `tick()` does all the work and reads time only from the `Clock` port, so
//! tests drive it with a manual clock instead of sleeping.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::{AdvancedOrderManager, ExecutionEngine, RiskService};
use crate::application::ports::{Clock, Ticker, VenuePort};
use crate::domain::order_execution::Order;
use crate::domain::shared::{ExecutionId, Symbol};

/// Default tick interval.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Everything one tick produced for the caller to act on.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    /// Clock time of the tick.
    pub at: DateTime<Utc>,
    /// Market orders from trailing stops that fired.
    pub triggered_stops: Vec<Order>,
    /// TWAP/VWAP slices that came due.
    pub algo_slices: Vec<Order>,
    /// POV slices sized from fresh volume.
    pub pov_slices: Vec<Order>,
    /// True when the risk day rolled over on this tick.
    pub rolled_over: bool,
}

impl TickReport {
    /// Total child orders produced.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.triggered_stops.len() + self.algo_slices.len() + self.pov_slices.len()
    }
}

#[derive(Debug, Default)]
struct MonitorState {
    last_volume: HashMap<Symbol, Decimal>,
    /// Volume seen since each POV execution's last slice.
    pov_window: HashMap<ExecutionId, Decimal>,
    current_day: Option<NaiveDate>,
}

/// Periodic driver for trailing stops, execution schedules and risk rollover.
pub struct MarketMonitor {
    advanced: Arc<AdvancedOrderManager>,
    executions: Arc<ExecutionEngine>,
    risk: Arc<RiskService>,
    venue: Arc<dyn VenuePort>,
    clock: Arc<dyn Clock>,
    tick_interval: Duration,
    state: Mutex<MonitorState>,
}

impl std::fmt::Debug for MarketMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketMonitor")
            .field("venue", &self.venue.name())
            .field("tick_interval", &self.tick_interval)
            .finish_non_exhaustive()
    }
}

impl MarketMonitor {
    /// Create a monitor that reads marks and volume from `venue`.
    #[must_use]
    pub fn new(
        advanced: Arc<AdvancedOrderManager>,
        executions: Arc<ExecutionEngine>,
        risk: Arc<RiskService>,
        venue: Arc<dyn VenuePort>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            advanced,
            executions,
            risk,
            venue,
            clock,
            tick_interval: DEFAULT_TICK_INTERVAL,
            state: Mutex::new(MonitorState::default()),
        }
    }

    /// Set the tick interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Tick interval.
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Run one pass of periodic work.
    pub async fn tick(&self) -> TickReport {
        let now = self.clock.now();
        let rolled_over = self.roll_day(now).await;

        let trailing = self.advanced.trailing_symbols().await;
        let pov = self.executions.running_pov().await;
        let symbols: BTreeSet<Symbol> = trailing
            .iter()
            .cloned()
            .chain(pov.iter().map(|(_, symbol)| symbol.clone()))
            .collect();
        let tickers = self.fetch_tickers(&symbols).await;

        let marks: HashMap<Symbol, Decimal> = tickers
            .iter()
            .filter(|(symbol, _)| trailing.contains(*symbol))
            .map(|(symbol, ticker)| (symbol.clone(), ticker.last))
            .collect();
        let triggered_stops = self.advanced.update_trailing_stops(&marks).await;

        let deltas = self.volume_deltas(&tickers).await;
        let pov_slices = self.size_pov_slices(&pov, &deltas).await;

        let algo_slices = self.executions.poll_due(now).await;

        let report = TickReport {
            at: now,
            triggered_stops,
            algo_slices,
            pov_slices,
            rolled_over,
        };
        debug!(
            at = %now,
            orders = report.order_count(),
            rolled_over,
            "Monitor tick"
        );
        report
    }

    /// Tick on the interval until shutdown, sending each report on `reports`.
    ///
    /// Stops early when the report receiver is dropped.
    pub async fn run(
        &self,
        reports: mpsc::Sender<TickReport>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        info!(
            interval_secs = self.tick_interval.as_secs(),
            venue = self.venue.name(),
            "Starting market monitor"
        );

        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let report = self.tick().await;
                    if reports.send(report).await.is_err() {
                        info!("Report receiver dropped; market monitor stopping");
                        break;
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Market monitor shutting down");
                    break;
                }
            }
        }
    }

    async fn roll_day(&self, now: DateTime<Utc>) -> bool {
        let today = now.date_naive();
        let previous = {
            let mut state = self.state.lock().await;
            state.current_day.replace(today)
        };
        match previous {
            Some(day) if day != today => {
                self.risk.reset_daily().await;
                info!(from = %day, to = %today, "Risk day rolled over");
                true
            }
            _ => false,
        }
    }

    async fn fetch_tickers(&self, symbols: &BTreeSet<Symbol>) -> HashMap<Symbol, Ticker> {
        let mut tickers = HashMap::with_capacity(symbols.len());
        for symbol in symbols {
            match self.venue.ticker(symbol).await {
                Ok(ticker) => {
                    tickers.insert(symbol.clone(), ticker);
                }
                Err(e) => warn!(
                    venue = self.venue.name(),
                    symbol = %symbol,
                    error = %e,
                    "Mark fetch failed"
                ),
            }
        }
        tickers
    }

    /// Offer each running POV execution the volume accumulated since its
    /// last slice. The window resets only when a slice is emitted, so volume
    /// seen while the minimum interval holds a slice back is kept.
    async fn size_pov_slices(
        &self,
        pov: &[(ExecutionId, Symbol)],
        deltas: &HashMap<Symbol, Decimal>,
    ) -> Vec<Order> {
        let mut state = self.state.lock().await;
        state.pov_window.retain(|id, _| pov.iter().any(|(running, _)| running == id));

        let mut slices = Vec::new();
        for (id, symbol) in pov {
            let Some(delta) = deltas.get(symbol) else {
                continue;
            };
            let window = state.pov_window.entry(id.clone()).or_default();
            *window += *delta;
            match self.executions.on_market_volume(id, *window).await {
                Ok(Some(order)) => {
                    *window = Decimal::ZERO;
                    slices.push(order);
                }
                Ok(None) => {}
                Err(e) => warn!(execution_id = %id, error = %e, "POV volume update failed"),
            }
        }
        slices
    }

    /// Volume traded since the previous sample, per symbol.
    ///
    /// The first sample of a symbol only sets the baseline. A counter that
    /// goes backwards (venue 24h window rolling) yields zero.
    async fn volume_deltas(&self, tickers: &HashMap<Symbol, Ticker>) -> HashMap<Symbol, Decimal> {
        let mut state = self.state.lock().await;
        let mut deltas = HashMap::new();
        for (symbol, ticker) in tickers {
            if let Some(previous) = state.last_volume.insert(symbol.clone(), ticker.volume) {
                deltas.insert(symbol.clone(), (ticker.volume - previous).max(Decimal::ZERO));
            }
        }
        deltas
    }
}
