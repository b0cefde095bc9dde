//! Risk Service
//!
//! Shares one [`RiskManager`] across tasks and turns the first daily loss
//! breach of a day into a critical alert.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::warn;

use crate::application::ports::{Alert, AlertKind, AlertSeverity, AlertSink, dispatch_alert};
use crate::domain::position_tracking::PositionSide;
use crate::domain::risk_management::{
    GateRejection, RiskError, RiskManager, RiskReport, RiskSnapshot,
};
use crate::domain::shared::Symbol;
use crate::observability::record_risk_rejection;

#[derive(Debug)]
struct RiskState {
    manager: RiskManager,
    breach_alerted: bool,
}

/// Mutex-guarded risk manager with alerting.
pub struct RiskService {
    state: Mutex<RiskState>,
    alerts: Arc<dyn AlertSink>,
}

impl std::fmt::Debug for RiskService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskService").finish_non_exhaustive()
    }
}

impl RiskService {
    /// Wrap a manager.
    #[must_use]
    pub fn new(manager: RiskManager, alerts: Arc<dyn AlertSink>) -> Self {
        Self {
            state: Mutex::new(RiskState {
                manager,
                breach_alerted: false,
            }),
            alerts,
        }
    }

    /// Units to trade for an entry and stop.
    pub async fn position_size(
        &self,
        portfolio_value: Decimal,
        entry_price: Decimal,
        stop_price: Decimal,
    ) -> Decimal {
        self.state
            .lock()
            .await
            .manager
            .position_size(portfolio_value, entry_price, stop_price)
    }

    /// Stop-loss and take-profit levels for an entry.
    pub async fn levels(&self, entry_price: Decimal, side: PositionSide) -> (Decimal, Decimal) {
        let state = self.state.lock().await;
        (
            state.manager.stop_loss(entry_price, side),
            state.manager.take_profit(entry_price, side),
        )
    }

    /// Record the day's P&L and report whether the loss limit is breached.
    ///
    /// Alerts once per day, on the first breach.
    pub async fn check_daily_loss(&self, current_pnl: Decimal) -> bool {
        let (breached, limit, first) = {
            let mut state = self.state.lock().await;
            let breached = state.manager.daily_loss_breached(current_pnl);
            let first = breached && !state.breach_alerted;
            if first {
                state.breach_alerted = true;
            }
            (breached, state.manager.config().max_daily_loss, first)
        };
        if first {
            let alert = Alert::new(
                AlertKind::Risk,
                AlertSeverity::Critical,
                "Daily loss limit reached",
                format!("Daily P&L {current_pnl} breaches the {limit} loss limit"),
            )
            .with_data("daily_pnl", current_pnl.to_string())
            .with_data("max_daily_loss", limit.to_string());
            dispatch_alert(self.alerts.as_ref(), alert).await;
        }
        breached
    }

    /// Reason a new position would be refused, if any.
    pub async fn open_rejection(
        &self,
        portfolio_value: Decimal,
        symbol: &Symbol,
    ) -> Option<GateRejection> {
        let rejection = self
            .state
            .lock()
            .await
            .manager
            .open_rejection(portfolio_value, symbol);
        if let Some(reason) = rejection {
            warn!(symbol = %symbol, reason = %reason, "Cannot open position");
            record_risk_rejection(&reason.to_string());
        }
        rejection
    }

    /// Whether a new position may be opened.
    pub async fn can_open(&self, portfolio_value: Decimal, symbol: &Symbol) -> bool {
        self.open_rejection(portfolio_value, symbol).await.is_none()
    }

    /// Track risk for a symbol.
    pub async fn add_risk(
        &self,
        symbol: &Symbol,
        risk_amount: Decimal,
        portfolio_value: Decimal,
    ) -> Result<Decimal, RiskError> {
        self.state
            .lock()
            .await
            .manager
            .add_risk(symbol, risk_amount, portfolio_value)
    }

    /// Release risk for a symbol.
    pub async fn remove_risk(&self, symbol: &Symbol) -> Option<Decimal> {
        self.state.lock().await.manager.remove_risk(symbol)
    }

    /// Start a new trading day.
    pub async fn reset_daily(&self) {
        let mut state = self.state.lock().await;
        state.manager.reset_daily();
        state.breach_alerted = false;
    }

    /// Current risk summary.
    pub async fn report(&self) -> RiskReport {
        self.state.lock().await.manager.risk_report()
    }

    /// Capture state for persistence.
    pub async fn snapshot(&self) -> RiskSnapshot {
        self.state.lock().await.manager.snapshot()
    }

    /// Replace state from a snapshot.
    pub async fn restore(&self, snapshot: RiskSnapshot) {
        let mut state = self.state.lock().await;
        state.manager = RiskManager::restore(snapshot);
        state.breach_alerted = state.manager.is_daily_loss_breached();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockAlertSink;
    use crate::domain::risk_management::RiskConfig;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn breach_alerts_once_per_day() {
        let mut sink = MockAlertSink::new();
        sink.expect_send()
            .withf(|a| a.kind == AlertKind::Risk && a.severity == AlertSeverity::Critical)
            .times(2)
            .returning(|_| Ok(()));
        let service = RiskService::new(
            RiskManager::new(RiskConfig::default().with_max_daily_loss(dec!(500))),
            Arc::new(sink),
        );

        assert!(!service.check_daily_loss(dec!(-499)).await);
        assert!(service.check_daily_loss(dec!(-500)).await);
        assert!(service.check_daily_loss(dec!(-700)).await);

        service.reset_daily().await;
        assert!(service.check_daily_loss(dec!(-600)).await);
    }

    #[tokio::test]
    async fn gate_refuses_duplicate_symbol() {
        let mut sink = MockAlertSink::new();
        sink.expect_send().never();
        let service = RiskService::new(RiskManager::default(), Arc::new(sink));
        let btc = Symbol::new("BTC/USDT");

        assert!(service.can_open(dec!(10000), &btc).await);
        service.add_risk(&btc, dec!(100), dec!(10000)).await.unwrap();
        assert_eq!(
            service.open_rejection(dec!(10000), &btc).await,
            Some(GateRejection::DuplicatePosition)
        );
        service.remove_risk(&btc).await;
        assert!(service.can_open(dec!(10000), &btc).await);
    }
}
