//! Execution Engine
//!
//! Registry of running TWAP, VWAP and POV executions. Every state change on
//! an execution happens under the registry mutex, so fills for one
//! execution are applied strictly in arrival order.
//!
//! Finished and cancelled executions are archived with their final
//! performance and reported to the alert sink.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::application::ports::{Alert, AlertKind, AlertSeverity, AlertSink, Clock, dispatch_alert};
use crate::domain::execution_tactics::{
    AlgoKind, AlgoPerformance, AlgoStatus, PovExecutor, PovParams, TacticError, TwapExecutor,
    TwapParams, VwapExecutor, VwapParams,
};
use crate::domain::order_execution::{Order, OrderSide};
use crate::domain::shared::{ExecutionId, Symbol};
use crate::observability::{
    record_execution_finished, record_slice_emitted, update_active_executions,
};

/// A registered execution.
#[derive(Debug, Clone)]
pub enum Execution {
    /// Time-weighted.
    Twap(TwapExecutor),
    /// Volume-weighted.
    Vwap(VwapExecutor),
    /// Percentage of volume.
    Pov(PovExecutor),
}

impl Execution {
    /// Execution identifier.
    #[must_use]
    pub const fn id(&self) -> &ExecutionId {
        match self {
            Self::Twap(e) => e.id(),
            Self::Vwap(e) => e.id(),
            Self::Pov(e) => e.id(),
        }
    }

    /// Algorithm kind.
    #[must_use]
    pub const fn kind(&self) -> AlgoKind {
        match self {
            Self::Twap(_) => AlgoKind::Twap,
            Self::Vwap(_) => AlgoKind::Vwap,
            Self::Pov(_) => AlgoKind::Pov,
        }
    }

    /// Lifecycle status.
    #[must_use]
    pub const fn status(&self) -> AlgoStatus {
        match self {
            Self::Twap(e) => e.status(),
            Self::Vwap(e) => e.status(),
            Self::Pov(e) => e.status(),
        }
    }

    /// Running performance.
    #[must_use]
    pub const fn performance(&self) -> &AlgoPerformance {
        match self {
            Self::Twap(e) => e.performance(),
            Self::Vwap(e) => e.performance(),
            Self::Pov(e) => e.performance(),
        }
    }

    /// Parent symbol.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        match self {
            Self::Twap(e) => &e.params().symbol,
            Self::Vwap(e) => &e.params().symbol,
            Self::Pov(e) => &e.params().symbol,
        }
    }

    /// Parent side.
    #[must_use]
    pub const fn side(&self) -> OrderSide {
        match self {
            Self::Twap(e) => e.params().side,
            Self::Vwap(e) => e.params().side,
            Self::Pov(e) => e.params().side,
        }
    }

    /// Child orders generated so far.
    #[must_use]
    pub const fn slices_sent(&self) -> usize {
        match self {
            Self::Twap(e) => e.slices_sent(),
            Self::Vwap(e) => e.slices_sent(),
            Self::Pov(e) => e.slices_sent(),
        }
    }

    fn start(&mut self, now: DateTime<Utc>) -> Result<(), TacticError> {
        match self {
            Self::Twap(e) => e.start(now),
            Self::Vwap(e) => e.start(now),
            Self::Pov(e) => e.start(now),
        }
    }

    fn pause(&mut self) -> Result<(), TacticError> {
        match self {
            Self::Twap(e) => e.pause(),
            Self::Vwap(e) => e.pause(),
            Self::Pov(e) => e.pause(),
        }
    }

    fn resume(&mut self) -> Result<(), TacticError> {
        match self {
            Self::Twap(e) => e.resume(),
            Self::Vwap(e) => e.resume(),
            Self::Pov(e) => e.resume(),
        }
    }

    fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), TacticError> {
        match self {
            Self::Twap(e) => e.cancel(now),
            Self::Vwap(e) => e.cancel(now),
            Self::Pov(e) => e.cancel(now),
        }
    }

    fn on_slice_filled(
        &mut self,
        quantity: Decimal,
        price: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, TacticError> {
        match self {
            Self::Twap(e) => e.on_slice_filled(quantity, price, now),
            Self::Vwap(e) => e.on_slice_filled(quantity, price, now),
            Self::Pov(e) => e.on_slice_filled(quantity, price, now).map(|()| None),
        }
    }

    fn status_view(&self) -> ExecutionStatus {
        let performance = self.performance().clone();
        ExecutionStatus {
            execution_id: self.id().clone(),
            algorithm: self.kind(),
            symbol: self.symbol().clone(),
            side: self.side(),
            status: self.status(),
            slices_sent: self.slices_sent(),
            slippage_bps: performance.slippage_bps(),
            performance,
        }
    }
}

/// Status view of one execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStatus {
    /// Execution identifier.
    pub execution_id: ExecutionId,
    /// Algorithm kind.
    pub algorithm: AlgoKind,
    /// Parent symbol.
    pub symbol: Symbol,
    /// Parent side.
    pub side: OrderSide,
    /// Lifecycle status.
    pub status: AlgoStatus,
    /// Child orders generated.
    pub slices_sent: usize,
    /// Slippage against the target price.
    pub slippage_bps: Decimal,
    /// Running performance.
    pub performance: AlgoPerformance,
}

#[derive(Debug, Default)]
struct Registry {
    active: BTreeMap<ExecutionId, Execution>,
    history: Vec<AlgoPerformance>,
}

impl Registry {
    fn get_mut(&mut self, id: &ExecutionId) -> Result<&mut Execution, TacticError> {
        self.active.get_mut(id).ok_or_else(|| TacticError::NotFound {
            execution_id: id.to_string(),
        })
    }

    fn archive(&mut self, id: &ExecutionId) -> Option<Execution> {
        let execution = self.active.remove(id)?;
        self.history.push(execution.performance().clone());
        update_active_executions(self.active.len());
        Some(execution)
    }
}

/// Execution algorithm registry.
pub struct ExecutionEngine {
    registry: Mutex<Registry>,
    alerts: Arc<dyn AlertSink>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine").finish_non_exhaustive()
    }
}

impl ExecutionEngine {
    /// Create an empty registry.
    #[must_use]
    pub fn new(alerts: Arc<dyn AlertSink>, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            alerts,
            clock,
        }
    }

    /// Start a TWAP execution.
    pub async fn start_twap(&self, params: TwapParams) -> Result<ExecutionId, TacticError> {
        let id = ExecutionId::generate();
        let executor = TwapExecutor::new(id, params)?;
        self.register(Execution::Twap(executor)).await
    }

    /// Start a VWAP execution.
    pub async fn start_vwap(&self, params: VwapParams) -> Result<ExecutionId, TacticError> {
        let id = ExecutionId::generate();
        let executor = VwapExecutor::new(id, params)?;
        self.register(Execution::Vwap(executor)).await
    }

    /// Start a POV execution.
    pub async fn start_pov(&self, params: PovParams) -> Result<ExecutionId, TacticError> {
        let id = ExecutionId::generate();
        let executor = PovExecutor::new(id, params)?;
        self.register(Execution::Pov(executor)).await
    }

    /// Next unsent TWAP/VWAP slice regardless of schedule.
    pub async fn next_slice(&self, id: &ExecutionId) -> Result<Option<Order>, TacticError> {
        let mut registry = self.registry.lock().await;
        let execution = registry.get_mut(id)?;
        let order = match &mut *execution {
            Execution::Twap(e) => e.next_slice()?,
            Execution::Vwap(e) => e.next_slice()?,
            Execution::Pov(_) => {
                return Err(TacticError::invalid(format!(
                    "execution {id} is POV; feed market volume instead"
                )));
            }
        };
        if order.is_some() {
            record_slice_emitted(execution.kind().as_str());
        }
        Ok(order)
    }

    /// Every TWAP/VWAP slice due at `now`, across all running executions.
    ///
    /// An execution that fails to emit a slice is logged and skipped until
    /// the next poll; slices already emitted on this pass are still returned.
    pub async fn poll_due(&self, now: DateTime<Utc>) -> Vec<Order> {
        let mut registry = self.registry.lock().await;
        let mut due = Vec::new();
        for (id, execution) in &mut registry.active {
            loop {
                let slice = match &mut *execution {
                    Execution::Twap(e) => e.poll_due(now),
                    Execution::Vwap(e) => e.poll_due(now),
                    Execution::Pov(_) => Ok(None),
                };
                match slice {
                    Ok(Some(order)) => {
                        record_slice_emitted(execution.kind().as_str());
                        due.push(order);
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(execution_id = %id, error = %e, "Due slice could not be emitted");
                        break;
                    }
                }
            }
        }
        due
    }

    /// Feed market volume observed since the last POV slice.
    pub async fn on_market_volume(
        &self,
        id: &ExecutionId,
        observed_volume: Decimal,
    ) -> Result<Option<Order>, TacticError> {
        let now = self.clock.now();
        let mut registry = self.registry.lock().await;
        let Execution::Pov(executor) = registry.get_mut(id)? else {
            return Err(TacticError::invalid(format!("execution {id} is not POV")));
        };
        let order = executor.calculate_next_slice(observed_volume, now)?;
        if order.is_some() {
            record_slice_emitted(AlgoKind::Pov.as_str());
        }
        Ok(order)
    }

    /// Running POV executions and their symbols.
    pub async fn running_pov(&self) -> Vec<(ExecutionId, Symbol)> {
        self.registry
            .lock()
            .await
            .active
            .values()
            .filter(|e| e.kind() == AlgoKind::Pov && e.status() == AlgoStatus::Running)
            .map(|e| (e.id().clone(), e.symbol().clone()))
            .collect()
    }

    /// Record a child fill. Returns the next TWAP/VWAP slice, if any.
    ///
    /// An execution that completes is archived and reported.
    pub async fn on_slice_filled(
        &self,
        id: &ExecutionId,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<Option<Order>, TacticError> {
        let now = self.clock.now();
        let (next, finished) = {
            let mut registry = self.registry.lock().await;
            let execution = registry.get_mut(id)?;
            let next = execution.on_slice_filled(quantity, price, now)?;
            if next.is_some() {
                record_slice_emitted(execution.kind().as_str());
            }
            let finished = if execution.status() == AlgoStatus::Completed {
                registry.archive(id)
            } else {
                None
            };
            (next, finished)
        };
        if let Some(execution) = finished {
            self.report_finished(&execution).await;
        }
        Ok(next)
    }

    /// Stop generating slices until resumed.
    pub async fn pause(&self, id: &ExecutionId) -> Result<(), TacticError> {
        self.registry.lock().await.get_mut(id)?.pause()?;
        info!(execution_id = %id, "Execution paused");
        Ok(())
    }

    /// Resume a paused execution.
    pub async fn resume(&self, id: &ExecutionId) -> Result<(), TacticError> {
        self.registry.lock().await.get_mut(id)?.resume()?;
        info!(execution_id = %id, "Execution resumed");
        Ok(())
    }

    /// Cancel an execution and archive its performance.
    ///
    /// Child orders already sent are not touched; cancel them at the venue.
    pub async fn cancel(&self, id: &ExecutionId) -> Result<AlgoPerformance, TacticError> {
        let now = self.clock.now();
        let execution = {
            let mut registry = self.registry.lock().await;
            registry.get_mut(id)?.cancel(now)?;
            registry.archive(id).ok_or_else(|| TacticError::NotFound {
                execution_id: id.to_string(),
            })?
        };
        self.report_finished(&execution).await;
        Ok(execution.performance().clone())
    }

    /// Status of one registered execution.
    pub async fn status(&self, id: &ExecutionId) -> Option<ExecutionStatus> {
        self.registry
            .lock()
            .await
            .active
            .get(id)
            .map(Execution::status_view)
    }

    /// Status of every registered execution.
    pub async fn status_all(&self) -> Vec<ExecutionStatus> {
        self.registry
            .lock()
            .await
            .active
            .values()
            .map(Execution::status_view)
            .collect()
    }

    /// Final performance of archived executions, oldest first.
    pub async fn performance_history(&self) -> Vec<AlgoPerformance> {
        self.registry.lock().await.history.clone()
    }

    async fn register(&self, mut execution: Execution) -> Result<ExecutionId, TacticError> {
        execution.start(self.clock.now())?;
        let id = execution.id().clone();
        let mut registry = self.registry.lock().await;
        registry.active.insert(id.clone(), execution);
        update_active_executions(registry.active.len());
        Ok(id)
    }

    async fn report_finished(&self, execution: &Execution) {
        let performance = execution.performance();
        let status = execution.status();
        let algorithm = execution.kind();
        record_execution_finished(
            algorithm.as_str(),
            &status.to_string(),
            performance.slippage_bps().to_f64().unwrap_or(0.0),
        );

        let (severity, title) = match status {
            AlgoStatus::Completed => (AlertSeverity::Low, "Execution completed"),
            _ => (AlertSeverity::Medium, "Execution cancelled"),
        };
        let alert = Alert::new(
            AlertKind::Execution,
            severity,
            title,
            format!(
                "{} {} executed {} of {} at {} ({}%)",
                algorithm.as_str().to_uppercase(),
                performance.execution_id,
                performance.executed_amount,
                performance.total_amount,
                performance.average_price.round_dp(8),
                performance.completion_percent.round_dp(2)
            ),
        )
        .with_symbol(execution.symbol().clone())
        .with_data("execution_id", performance.execution_id.as_str())
        .with_data("status", status.to_string())
        .with_data("slippage_bps", performance.slippage_bps().round_dp(4).to_string());
        dispatch_alert(self.alerts.as_ref(), alert).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::execution_tactics::PlannedSlice;
    use crate::infrastructure::{ManualClock, NoOpAlertSink};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn engine_at(start: DateTime<Utc>) -> ExecutionEngine {
        ExecutionEngine::new(Arc::new(NoOpAlertSink), Arc::new(ManualClock::new(start)))
    }

    #[tokio::test]
    async fn poll_due_keeps_slices_when_one_execution_fails() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap();
        let engine = engine_at(start);

        // the zero-size second slice cannot become an order
        let broken = TwapExecutor::from_plan(
            ExecutionId::new("exec-a"),
            TwapParams::new("BTC/USDT", OrderSide::Buy, dec!(1), 1, 60),
            vec![PlannedSlice::new(0, dec!(1), 0), PlannedSlice::new(1, Decimal::ZERO, 0)],
        );
        let broken_id = engine.register(Execution::Twap(broken)).await.unwrap();
        engine
            .start_twap(TwapParams::new("ETH/USDT", OrderSide::Sell, dec!(2), 2, 60))
            .await
            .unwrap();

        let due = engine.poll_due(start).await;
        let mut symbols: Vec<_> = due.iter().map(|o| o.symbol().to_string()).collect();
        symbols.sort();
        assert_eq!(symbols, vec!["BTC/USDT", "ETH/USDT"]);

        let status = engine.status(&broken_id).await.unwrap();
        assert_eq!(status.slices_sent, 1);
        assert_eq!(status.status, AlgoStatus::Running);
    }

    #[tokio::test]
    async fn poll_due_ignores_pov() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap();
        let engine = engine_at(start);
        engine
            .start_pov(PovParams::new("BTC/USDT", OrderSide::Buy, dec!(5)))
            .await
            .unwrap();
        assert!(engine.poll_due(start).await.is_empty());
    }
}
