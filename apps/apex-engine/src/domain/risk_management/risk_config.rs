//! Risk configuration and level presets.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::RiskError;

/// Risk appetite preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Small positions, tight limits.
    Conservative,
    /// Balanced defaults.
    #[default]
    Moderate,
    /// Large positions, wide limits.
    Aggressive,
}

impl RiskLevel {
    /// Daily loss limit of the preset as a fraction of portfolio value.
    #[must_use]
    pub const fn daily_loss_fraction(&self) -> Decimal {
        match self {
            Self::Conservative => Decimal::from_parts(3, 0, 0, false, 2),
            Self::Moderate => Decimal::from_parts(5, 0, 0, false, 2),
            Self::Aggressive => Decimal::from_parts(10, 0, 0, false, 2),
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conservative => write!(f, "conservative"),
            Self::Moderate => write!(f, "moderate"),
            Self::Aggressive => write!(f, "aggressive"),
        }
    }
}

/// Risk limits.
///
/// Fractions are relative to portfolio value. `max_daily_loss` is an
/// absolute amount in quote currency, compared against the day's P&L.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Max notional per position as a fraction of portfolio value.
    pub max_position_size: Decimal,
    /// Max loss per day, in quote currency.
    pub max_daily_loss: Decimal,
    /// Max sum of per-position risk fractions.
    pub max_total_risk: Decimal,
    /// Stop distance from entry, and the risk budget per trade.
    pub stop_loss_percent: Decimal,
    /// Target distance from entry.
    pub take_profit_percent: Decimal,
    /// Preset this configuration came from.
    pub risk_level: RiskLevel,
}

/// Portfolio value the default daily loss limit is derived from.
const DEFAULT_REFERENCE_PORTFOLIO: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

impl Default for RiskConfig {
    fn default() -> Self {
        Self::preset(RiskLevel::Moderate, DEFAULT_REFERENCE_PORTFOLIO)
    }
}

impl RiskConfig {
    /// Build the fixed parameter bundle for `level`.
    ///
    /// The daily loss limit is the preset fraction of `portfolio_value`.
    #[must_use]
    pub fn preset(level: RiskLevel, portfolio_value: Decimal) -> Self {
        let (max_position_size, max_total_risk, stop_loss_percent, take_profit_percent) =
            match level {
                RiskLevel::Conservative => (
                    Decimal::new(5, 2),
                    Decimal::new(10, 2),
                    Decimal::new(15, 3),
                    Decimal::new(3, 2),
                ),
                RiskLevel::Moderate => (
                    Decimal::new(10, 2),
                    Decimal::new(20, 2),
                    Decimal::new(2, 2),
                    Decimal::new(5, 2),
                ),
                RiskLevel::Aggressive => (
                    Decimal::new(20, 2),
                    Decimal::new(30, 2),
                    Decimal::new(3, 2),
                    Decimal::new(10, 2),
                ),
            };

        Self {
            max_position_size,
            max_daily_loss: portfolio_value * level.daily_loss_fraction(),
            max_total_risk,
            stop_loss_percent,
            take_profit_percent,
            risk_level: level,
        }
    }

    /// Conservative preset.
    #[must_use]
    pub fn conservative(portfolio_value: Decimal) -> Self {
        Self::preset(RiskLevel::Conservative, portfolio_value)
    }

    /// Aggressive preset.
    #[must_use]
    pub fn aggressive(portfolio_value: Decimal) -> Self {
        Self::preset(RiskLevel::Aggressive, portfolio_value)
    }

    /// Override the daily loss limit.
    #[must_use]
    pub const fn with_max_daily_loss(mut self, amount: Decimal) -> Self {
        self.max_daily_loss = amount;
        self
    }

    /// Check that every limit is in range.
    pub fn validate(&self) -> Result<(), RiskError> {
        let fractions = [
            ("max_position_size", self.max_position_size),
            ("max_total_risk", self.max_total_risk),
            ("stop_loss_percent", self.stop_loss_percent),
            ("take_profit_percent", self.take_profit_percent),
        ];
        for (field, value) in fractions {
            if value <= Decimal::ZERO || value > Decimal::ONE {
                return Err(RiskError::InvalidConfiguration {
                    field: field.to_string(),
                    message: format!("must be in (0, 1], got {value}"),
                });
            }
        }
        if self.max_daily_loss <= Decimal::ZERO {
            return Err(RiskError::InvalidConfiguration {
                field: "max_daily_loss".to_string(),
                message: format!("must be positive, got {}", self.max_daily_loss),
            });
        }
        Ok(())
    }
}
