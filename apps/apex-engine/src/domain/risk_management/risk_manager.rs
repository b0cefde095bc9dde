//! Risk manager.
//!
//! Per-symbol risk fractions are the single source of truth; the total is
//! always derived as their sum so add/remove can never drift apart.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};

use super::errors::RiskError;
use super::risk_config::{RiskConfig, RiskLevel};
use crate::domain::position_tracking::PositionSide;
use crate::domain::shared::Symbol;

/// Decimal places kept on computed position sizes (rounded toward zero).
const SIZE_DP: u32 = 8;

/// Why the gate refused a new position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateRejection {
    /// The day's loss limit is already breached.
    DailyLossLimit,
    /// Tracked risk already at or above the total limit.
    MaxTotalRisk,
    /// A position in the symbol is already tracked.
    DuplicatePosition,
    /// Portfolio value was not positive.
    InvalidPortfolio,
}

impl fmt::Display for GateRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DailyLossLimit => write!(f, "daily loss limit reached"),
            Self::MaxTotalRisk => write!(f, "max total risk reached"),
            Self::DuplicatePosition => write!(f, "position already open in symbol"),
            Self::InvalidPortfolio => write!(f, "portfolio value must be positive"),
        }
    }
}

/// Point-in-time risk summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskReport {
    /// P&L recorded for the current day.
    pub daily_pnl: Decimal,
    /// Configured daily loss limit.
    pub max_daily_loss: Decimal,
    /// Sum of tracked risk fractions.
    pub total_risk: Decimal,
    /// Configured total risk limit.
    pub max_total_risk: Decimal,
    /// Tracked per-symbol risk fractions.
    pub positions: BTreeMap<Symbol, Decimal>,
    /// Preset in force.
    pub risk_level: RiskLevel,
    /// Whether the daily loss limit is breached.
    pub daily_loss_breached: bool,
}

/// Serializable risk state for snapshot/reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskSnapshot {
    /// Limits in force.
    pub config: RiskConfig,
    /// P&L recorded for the current day.
    pub daily_pnl: Decimal,
    /// Tracked per-symbol risk fractions.
    pub positions_risk: BTreeMap<Symbol, Decimal>,
}

/// Computes sizes and levels and gates new positions.
#[derive(Debug, Clone)]
pub struct RiskManager {
    config: RiskConfig,
    daily_pnl: Decimal,
    positions_risk: BTreeMap<Symbol, Decimal>,
}

impl Default for RiskManager {
    fn default() -> Self {
        Self::new(RiskConfig::default())
    }
}

impl RiskManager {
    /// Create a manager with the given limits.
    #[must_use]
    pub const fn new(config: RiskConfig) -> Self {
        Self {
            config,
            daily_pnl: Decimal::ZERO,
            positions_risk: BTreeMap::new(),
        }
    }

    /// Limits in force.
    #[must_use]
    pub const fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// P&L recorded for the current day.
    #[must_use]
    pub const fn daily_pnl(&self) -> Decimal {
        self.daily_pnl
    }

    /// Sum of tracked per-symbol risk fractions.
    #[must_use]
    pub fn total_risk(&self) -> Decimal {
        self.positions_risk.values().copied().sum()
    }

    /// Tracked risk fraction for `symbol`.
    #[must_use]
    pub fn position_risk(&self, symbol: &Symbol) -> Option<Decimal> {
        self.positions_risk.get(symbol).copied()
    }

    /// Units to buy or sell given an entry and stop.
    ///
    /// Risk per trade is `portfolio * stop_loss_percent`, divided by the
    /// per-unit risk and capped at `portfolio * max_position_size / entry`.
    /// When entry equals stop the cap is used and a warning logged.
    #[must_use]
    pub fn position_size(
        &self,
        portfolio_value: Decimal,
        entry_price: Decimal,
        stop_price: Decimal,
    ) -> Decimal {
        if portfolio_value <= Decimal::ZERO || entry_price <= Decimal::ZERO {
            warn!(
                portfolio_value = %portfolio_value,
                entry_price = %entry_price,
                "Non-positive sizing input, sizing to zero"
            );
            return Decimal::ZERO;
        }

        let cap = portfolio_value * self.config.max_position_size / entry_price;
        let risk_per_unit = (entry_price - stop_price).abs();

        let size = if risk_per_unit.is_zero() {
            warn!(
                entry_price = %entry_price,
                "Risk per unit is zero, using max position size"
            );
            cap
        } else {
            let risk_amount = portfolio_value * self.config.stop_loss_percent;
            (risk_amount / risk_per_unit).min(cap)
        };

        size.round_dp_with_strategy(SIZE_DP, RoundingStrategy::ToZero)
    }

    /// Stop-loss level for an entry: below for longs, above for shorts.
    #[must_use]
    pub fn stop_loss(&self, entry_price: Decimal, side: PositionSide) -> Decimal {
        match side {
            PositionSide::Long => entry_price * (Decimal::ONE - self.config.stop_loss_percent),
            PositionSide::Short => entry_price * (Decimal::ONE + self.config.stop_loss_percent),
        }
    }

    /// Take-profit level for an entry: above for longs, below for shorts.
    #[must_use]
    pub fn take_profit(&self, entry_price: Decimal, side: PositionSide) -> Decimal {
        match side {
            PositionSide::Long => entry_price * (Decimal::ONE + self.config.take_profit_percent),
            PositionSide::Short => entry_price * (Decimal::ONE - self.config.take_profit_percent),
        }
    }

    /// Record `current_pnl` as the day's P&L and report whether the loss
    /// limit is breached.
    pub fn daily_loss_breached(&mut self, current_pnl: Decimal) -> bool {
        self.daily_pnl = current_pnl;
        let breached = self.is_daily_loss_breached();
        if breached {
            warn!(
                daily_pnl = %current_pnl,
                limit = %self.config.max_daily_loss,
                "Daily loss limit reached"
            );
        }
        breached
    }

    /// Whether the recorded daily P&L breaches the limit.
    #[must_use]
    pub fn is_daily_loss_breached(&self) -> bool {
        self.daily_pnl.min(Decimal::ZERO).abs() >= self.config.max_daily_loss
    }

    /// Reason a new position in `symbol` would be refused, if any.
    #[must_use]
    pub fn open_rejection(&self, portfolio_value: Decimal, symbol: &Symbol) -> Option<GateRejection> {
        if portfolio_value <= Decimal::ZERO {
            Some(GateRejection::InvalidPortfolio)
        } else if self.is_daily_loss_breached() {
            Some(GateRejection::DailyLossLimit)
        } else if self.total_risk() >= self.config.max_total_risk {
            Some(GateRejection::MaxTotalRisk)
        } else if self.positions_risk.contains_key(symbol) {
            Some(GateRejection::DuplicatePosition)
        } else {
            None
        }
    }

    /// Whether a new position in `symbol` may be opened.
    #[must_use]
    pub fn can_open(&self, portfolio_value: Decimal, symbol: &Symbol) -> bool {
        match self.open_rejection(portfolio_value, symbol) {
            None => true,
            Some(reason) => {
                warn!(symbol = %symbol, reason = %reason, "Cannot open position");
                false
            }
        }
    }

    /// Track `risk_amount` for `symbol` as a fraction of portfolio value.
    ///
    /// Replaces any fraction already tracked for the symbol. Leaves state
    /// untouched on error.
    pub fn add_risk(
        &mut self,
        symbol: &Symbol,
        risk_amount: Decimal,
        portfolio_value: Decimal,
    ) -> Result<Decimal, RiskError> {
        if portfolio_value <= Decimal::ZERO {
            return Err(RiskError::InvalidInput {
                field: "portfolio_value".to_string(),
                message: format!("must be positive, got {portfolio_value}"),
            });
        }
        if risk_amount < Decimal::ZERO {
            return Err(RiskError::InvalidInput {
                field: "risk_amount".to_string(),
                message: format!("must not be negative, got {risk_amount}"),
            });
        }

        let fraction = risk_amount / portfolio_value;
        self.positions_risk.insert(symbol.clone(), fraction);
        info!(
            symbol = %symbol,
            fraction = %fraction,
            total_risk = %self.total_risk(),
            "Position risk tracked"
        );
        Ok(fraction)
    }

    /// Stop tracking risk for `symbol`.
    pub fn remove_risk(&mut self, symbol: &Symbol) -> Option<Decimal> {
        let removed = self.positions_risk.remove(symbol);
        if removed.is_some() {
            info!(symbol = %symbol, total_risk = %self.total_risk(), "Position risk released");
        }
        removed
    }

    /// Record the day's P&L without evaluating the limit.
    pub const fn record_daily_pnl(&mut self, pnl: Decimal) {
        self.daily_pnl = pnl;
    }

    /// Start a new trading day.
    pub fn reset_daily(&mut self) {
        info!(previous_pnl = %self.daily_pnl, "Daily risk statistics reset");
        self.daily_pnl = Decimal::ZERO;
    }

    /// Current risk summary.
    #[must_use]
    pub fn risk_report(&self) -> RiskReport {
        RiskReport {
            daily_pnl: self.daily_pnl,
            max_daily_loss: self.config.max_daily_loss,
            total_risk: self.total_risk(),
            max_total_risk: self.config.max_total_risk,
            positions: self.positions_risk.clone(),
            risk_level: self.config.risk_level,
            daily_loss_breached: self.is_daily_loss_breached(),
        }
    }

    /// Capture state for persistence.
    #[must_use]
    pub fn snapshot(&self) -> RiskSnapshot {
        RiskSnapshot {
            config: self.config.clone(),
            daily_pnl: self.daily_pnl,
            positions_risk: self.positions_risk.clone(),
        }
    }

    /// Rebuild a manager from a snapshot.
    #[must_use]
    pub fn restore(snapshot: RiskSnapshot) -> Self {
        Self {
            config: snapshot.config,
            daily_pnl: snapshot.daily_pnl,
            positions_risk: snapshot.positions_risk,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn btc() -> Symbol {
        Symbol::new("BTC/USDT")
    }

    #[test]
    fn daily_loss_scenario() {
        let mut rm = RiskManager::new(RiskConfig::default().with_max_daily_loss(dec!(500)));
        assert!(rm.daily_loss_breached(dec!(-600)));
        assert!(!rm.daily_loss_breached(dec!(-300)));
        assert!(!rm.daily_loss_breached(dec!(1000)));
        assert!(rm.daily_loss_breached(dec!(-500)));
    }

    #[test]
    fn position_size_risk_based() {
        let rm = RiskManager::default();
        // risk 10000 * 0.02 = 200, per unit 100 -> 2 units; cap 10000*0.1/1000 = 1
        assert_eq!(rm.position_size(dec!(10000), dec!(1000), dec!(900)), dec!(1));
        // per unit 50 -> 4 units, under the cap of 10
        assert_eq!(rm.position_size(dec!(10000), dec!(100), dec!(50)), dec!(4));
    }

    #[test]
    fn position_size_zero_risk_falls_back_to_cap() {
        let rm = RiskManager::default();
        assert_eq!(rm.position_size(dec!(10000), dec!(50), dec!(50)), dec!(20));
    }

    #[test]
    fn stop_and_target_flip_for_short() {
        let rm = RiskManager::default();
        assert_eq!(rm.stop_loss(dec!(100), PositionSide::Long), dec!(98));
        assert_eq!(rm.stop_loss(dec!(100), PositionSide::Short), dec!(102));
        assert_eq!(rm.take_profit(dec!(100), PositionSide::Long), dec!(105));
        assert_eq!(rm.take_profit(dec!(100), PositionSide::Short), dec!(95));
    }

    #[test]
    fn gate_rejects_duplicate_symbol() {
        let mut rm = RiskManager::default();
        assert!(rm.can_open(dec!(10000), &btc()));
        rm.add_risk(&btc(), dec!(100), dec!(10000)).unwrap();
        assert_eq!(
            rm.open_rejection(dec!(10000), &btc()),
            Some(GateRejection::DuplicatePosition)
        );
        assert!(rm.can_open(dec!(10000), &Symbol::new("ETH/USDT")));
    }

    #[test]
    fn gate_rejects_when_total_risk_reached() {
        let mut rm = RiskManager::default();
        rm.add_risk(&btc(), dec!(2000), dec!(10000)).unwrap();
        assert_eq!(
            rm.open_rejection(dec!(10000), &Symbol::new("ETH/USDT")),
            Some(GateRejection::MaxTotalRisk)
        );
    }

    #[test]
    fn gate_rejects_after_daily_breach_until_reset() {
        let mut rm = RiskManager::default();
        rm.daily_loss_breached(dec!(-750));
        assert!(!rm.can_open(dec!(10000), &btc()));
        rm.reset_daily();
        assert!(rm.can_open(dec!(10000), &btc()));
    }

    #[test]
    fn total_risk_is_sum_of_tracked() {
        let mut rm = RiskManager::default();
        rm.add_risk(&btc(), dec!(100), dec!(10000)).unwrap();
        rm.add_risk(&Symbol::new("ETH/USDT"), dec!(50), dec!(10000)).unwrap();
        assert_eq!(rm.total_risk(), dec!(0.015));
        rm.add_risk(&btc(), dec!(200), dec!(10000)).unwrap();
        assert_eq!(rm.total_risk(), dec!(0.025));
        assert_eq!(rm.remove_risk(&btc()), Some(dec!(0.02)));
        assert_eq!(rm.total_risk(), dec!(0.005));
        assert_eq!(rm.remove_risk(&btc()), None);
    }

    #[test]
    fn add_risk_error_leaves_state_untouched() {
        let mut rm = RiskManager::default();
        rm.add_risk(&btc(), dec!(100), dec!(10000)).unwrap();
        assert!(rm.add_risk(&btc(), dec!(100), Decimal::ZERO).is_err());
        assert_eq!(rm.total_risk(), dec!(0.01));
    }

    #[test]
    fn snapshot_restore_roundtrip() {
        let mut rm = RiskManager::default();
        rm.add_risk(&btc(), dec!(100), dec!(10000)).unwrap();
        rm.record_daily_pnl(dec!(-42));
        let json = serde_json::to_string(&rm.snapshot()).unwrap();
        let restored = RiskManager::restore(serde_json::from_str(&json).unwrap());
        assert_eq!(restored.risk_report(), rm.risk_report());
    }

    proptest! {
        #[test]
        fn position_size_never_exceeds_cap(
            portfolio in 1i64..10_000_000,
            entry in 1i64..100_000_000,
            stop in 0i64..100_000_000,
        ) {
            let rm = RiskManager::default();
            let portfolio = Decimal::new(portfolio, 0);
            let entry = Decimal::new(entry, 2);
            let stop = Decimal::new(stop, 2);
            let size = rm.position_size(portfolio, entry, stop);
            prop_assert!(size >= Decimal::ZERO);
            prop_assert!(size * entry <= portfolio * rm.config().max_position_size);
        }
    }
}
