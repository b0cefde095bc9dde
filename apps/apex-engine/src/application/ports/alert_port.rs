//! Alert Port (Driven Port)
//!
//! Structured notifications the core emits on order rejection, daily loss
//! breach, routing exhaustion and execution completion or cancellation.
//! Delivery is the sink's concern; the core only logs failures.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::domain::shared::{Metadata, Symbol};

/// Alert category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    /// Order lifecycle.
    Order,
    /// Risk limits.
    Risk,
    /// Venue routing.
    Routing,
    /// Execution algorithms.
    Execution,
    /// Process-level events.
    System,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Order => write!(f, "order"),
            Self::Risk => write!(f, "risk"),
            Self::Routing => write!(f, "routing"),
            Self::Execution => write!(f, "execution"),
            Self::System => write!(f, "system"),
        }
    }
}

/// Alert severity, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Informational.
    Low,
    /// Worth a look.
    Medium,
    /// Needs attention.
    High,
    /// Needs attention now.
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// A structured alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Category.
    pub kind: AlertKind,
    /// Urgency.
    pub severity: AlertSeverity,
    /// Short title.
    pub title: String,
    /// Human-readable message.
    pub message: String,
    /// Symbol involved, if any.
    pub symbol: Option<Symbol>,
    /// Structured payload.
    pub data: Metadata,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    /// Create an alert stamped now.
    #[must_use]
    pub fn new(
        kind: AlertKind,
        severity: AlertSeverity,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            title: title.into(),
            message: message.into(),
            symbol: None,
            data: Metadata::new(),
            timestamp: Utc::now(),
        }
    }

    /// Attach the symbol.
    #[must_use]
    pub fn with_symbol(mut self, symbol: Symbol) -> Self {
        self.symbol = Some(symbol);
        self
    }

    /// Attach a payload entry.
    #[must_use]
    pub fn with_data(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }
}

/// Delivery failure reported by a sink.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AlertError {
    /// Channel refused or unreachable.
    #[error("alert delivery failed: {message}")]
    DeliveryFailed {
        /// Error details.
        message: String,
    },
}

/// Port for alert delivery.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Deliver one alert.
    async fn send(&self, alert: &Alert) -> Result<(), AlertError>;
}

/// Send an alert, logging instead of propagating a delivery failure.
pub async fn dispatch_alert(sink: &dyn AlertSink, alert: Alert) {
    if let Err(e) = sink.send(&alert).await {
        warn!(
            kind = %alert.kind,
            severity = %alert.severity,
            title = %alert.title,
            error = %e,
            "Alert delivery failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dispatch_swallows_sink_failure() {
        let mut sink = MockAlertSink::new();
        sink.expect_send().times(1).returning(|_| {
            Err(AlertError::DeliveryFailed {
                message: "smtp down".to_string(),
            })
        });

        let alert = Alert::new(AlertKind::System, AlertSeverity::Low, "ping", "hello");
        dispatch_alert(&sink, alert).await;
    }

    #[test]
    fn severity_orders_by_urgency() {
        assert!(AlertSeverity::Critical > AlertSeverity::High);
        assert!(AlertSeverity::Low < AlertSeverity::Medium);
    }
}
