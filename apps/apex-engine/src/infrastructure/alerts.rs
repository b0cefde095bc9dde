//! Alert sink adapters.

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::application::ports::{Alert, AlertError, AlertSeverity, AlertSink};

/// Writes alerts as structured tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn send(&self, alert: &Alert) -> Result<(), AlertError> {
        let symbol = alert.symbol.as_ref().map(|s| s.as_str().to_string());
        match alert.severity {
            AlertSeverity::Critical | AlertSeverity::High => error!(
                kind = %alert.kind,
                severity = %alert.severity,
                symbol = ?symbol,
                title = %alert.title,
                "{}",
                alert.message
            ),
            AlertSeverity::Medium => warn!(
                kind = %alert.kind,
                severity = %alert.severity,
                symbol = ?symbol,
                title = %alert.title,
                "{}",
                alert.message
            ),
            AlertSeverity::Low => info!(
                kind = %alert.kind,
                severity = %alert.severity,
                symbol = ?symbol,
                title = %alert.title,
                "{}",
                alert.message
            ),
        }
        Ok(())
    }
}

/// Keeps every alert in memory.
#[derive(Debug, Default)]
pub struct InMemoryAlertSink {
    alerts: Mutex<Vec<Alert>>,
}

impl InMemoryAlertSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every alert received, oldest first.
    #[must_use]
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().clone()
    }

    /// Number of alerts received.
    #[must_use]
    pub fn len(&self) -> usize {
        self.alerts.lock().len()
    }

    /// True when nothing was received.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alerts.lock().is_empty()
    }

    /// Drop everything received so far.
    pub fn clear(&self) {
        self.alerts.lock().clear();
    }
}

#[async_trait]
impl AlertSink for InMemoryAlertSink {
    async fn send(&self, alert: &Alert) -> Result<(), AlertError> {
        self.alerts.lock().push(alert.clone());
        Ok(())
    }
}

/// Discards every alert.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpAlertSink;

#[async_trait]
impl AlertSink for NoOpAlertSink {
    async fn send(&self, _alert: &Alert) -> Result<(), AlertError> {
        Ok(())
    }
}
