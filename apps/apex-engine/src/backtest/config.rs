//! Backtest configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::BacktestError;
use crate::domain::risk_management::RiskLevel;

/// Capital, costs and sizing for one backtest run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Starting capital.
    pub initial_capital: Decimal,
    /// Commission rate charged on entry and exit notional.
    pub commission: Decimal,
    /// Slippage rate applied against the trader on every fill.
    pub slippage: Decimal,
    /// Fraction of capital committed to each position.
    pub position_fraction: Decimal,
    /// Open shorts on SELL signals when flat.
    pub allow_short: bool,
    /// Risk preset used for default stops and entry gating.
    pub risk_level: RiskLevel,
    /// Bar timeframe label carried into the result.
    pub timeframe: String,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: Decimal::from(10_000),
            commission: Decimal::new(1, 3),
            slippage: Decimal::new(5, 4),
            position_fraction: Decimal::new(95, 2),
            allow_short: false,
            risk_level: RiskLevel::Moderate,
            timeframe: "1h".to_string(),
        }
    }
}

impl BacktestConfig {
    /// Frictionless config: no commission, no slippage.
    #[must_use]
    pub fn frictionless() -> Self {
        Self {
            commission: Decimal::ZERO,
            slippage: Decimal::ZERO,
            ..Self::default()
        }
    }

    /// Check ranges.
    pub fn validate(&self) -> Result<(), BacktestError> {
        if self.initial_capital <= Decimal::ZERO {
            return Err(BacktestError::config("initial_capital", "must be positive"));
        }
        if self.commission < Decimal::ZERO || self.commission >= Decimal::ONE {
            return Err(BacktestError::config("commission", "must be in [0, 1)"));
        }
        if self.slippage < Decimal::ZERO || self.slippage >= Decimal::ONE {
            return Err(BacktestError::config("slippage", "must be in [0, 1)"));
        }
        if self.position_fraction <= Decimal::ZERO || self.position_fraction > Decimal::ONE {
            return Err(BacktestError::config("position_fraction", "must be in (0, 1]"));
        }
        Ok(())
    }
}
