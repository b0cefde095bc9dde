//! Strategy signals.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::{Metadata, Symbol};

/// Direction of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    /// Go long, or close a short.
    Buy,
    /// Close a long, or go short when shorting is allowed.
    Sell,
}

/// A strategy's trading intent for one bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    /// Direction.
    pub kind: SignalKind,
    /// Symbol.
    pub symbol: Symbol,
    /// Reference price, usually the bar close.
    pub price: Decimal,
    /// Strategy confidence in `[0, 1]`.
    pub confidence: Decimal,
    /// Bar time the signal belongs to.
    pub time: DateTime<Utc>,
    /// Opaque strategy data. `stop_loss` and `take_profit` are honored.
    pub metadata: Metadata,
}

impl Signal {
    /// Signal with full confidence and no metadata.
    #[must_use]
    pub fn new(kind: SignalKind, symbol: impl Into<Symbol>, price: Decimal, time: DateTime<Utc>) -> Self {
        Self {
            kind,
            symbol: symbol.into(),
            price,
            confidence: Decimal::ONE,
            time,
            metadata: Metadata::new(),
        }
    }

    /// BUY signal.
    #[must_use]
    pub fn buy(symbol: impl Into<Symbol>, price: Decimal, time: DateTime<Utc>) -> Self {
        Self::new(SignalKind::Buy, symbol, price, time)
    }

    /// SELL signal.
    #[must_use]
    pub fn sell(symbol: impl Into<Symbol>, price: Decimal, time: DateTime<Utc>) -> Self {
        Self::new(SignalKind::Sell, symbol, price, time)
    }

    /// Set the confidence.
    #[must_use]
    pub const fn with_confidence(mut self, confidence: Decimal) -> Self {
        self.confidence = confidence;
        self
    }

    /// Suggest a stop-loss level.
    #[must_use]
    pub fn with_stop_loss(self, level: Decimal) -> Self {
        self.with_meta("stop_loss", level.to_string())
    }

    /// Suggest a take-profit level.
    #[must_use]
    pub fn with_take_profit(self, level: Decimal) -> Self {
        self.with_meta("take_profit", level.to_string())
    }

    /// Attach a metadata entry.
    #[must_use]
    pub fn with_meta(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Suggested stop-loss, if any.
    #[must_use]
    pub fn stop_loss(&self) -> Option<Decimal> {
        self.decimal_meta("stop_loss")
    }

    /// Suggested take-profit, if any.
    #[must_use]
    pub fn take_profit(&self) -> Option<Decimal> {
        self.decimal_meta("take_profit")
    }

    /// Decimal stored as a JSON string or number.
    fn decimal_meta(&self, key: &str) -> Option<Decimal> {
        match self.metadata.get(key)? {
            serde_json::Value::String(s) => Decimal::from_str(s).ok(),
            serde_json::Value::Number(n) => Decimal::from_str(&n.to_string())
                .or_else(|_| Decimal::from_scientific(&n.to_string()))
                .ok(),
            _ => None,
        }
        .filter(|level| *level > Decimal::ZERO)
    }
}
