//! Execution algorithm parameters.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::execution_tactics::errors::TacticError;
use crate::domain::order_execution::OrderSide;
use crate::domain::shared::Symbol;

/// Parameters for a TWAP execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwapParams {
    /// Symbol to execute.
    pub symbol: Symbol,
    /// Side of the parent order.
    pub side: OrderSide,
    /// Parent order quantity.
    pub total_amount: Decimal,
    /// Execution window (minutes).
    pub duration_minutes: u32,
    /// Time between slices (seconds).
    pub interval_seconds: u32,
    /// Limit price for every slice; market slices when absent.
    pub price_limit: Option<Decimal>,
}

impl TwapParams {
    /// TWAP with market slices.
    #[must_use]
    pub fn new(
        symbol: impl Into<Symbol>,
        side: OrderSide,
        total_amount: Decimal,
        duration_minutes: u32,
        interval_seconds: u32,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            total_amount,
            duration_minutes,
            interval_seconds,
            price_limit: None,
        }
    }

    /// Use limit slices at `price`.
    #[must_use]
    pub const fn with_price_limit(mut self, price: Decimal) -> Self {
        self.price_limit = Some(price);
        self
    }

    /// Number of slices: `max(1, duration / interval)`.
    #[must_use]
    pub fn slice_count(&self) -> usize {
        let total_seconds = u64::from(self.duration_minutes) * 60;
        let interval = u64::from(self.interval_seconds.max(1));
        usize::try_from(total_seconds / interval).unwrap_or(usize::MAX).max(1)
    }

    /// Validate the parameters.
    pub fn validate(&self) -> Result<(), TacticError> {
        validate_common(&self.symbol, self.total_amount, self.price_limit)?;
        if self.duration_minutes == 0 {
            return Err(TacticError::invalid("duration_minutes must be positive"));
        }
        if self.interval_seconds == 0 {
            return Err(TacticError::invalid("interval_seconds must be positive"));
        }
        Ok(())
    }
}

/// Parameters for a VWAP execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VwapParams {
    /// Symbol to execute.
    pub symbol: Symbol,
    /// Side of the parent order.
    pub side: OrderSide,
    /// Parent order quantity.
    pub total_amount: Decimal,
    /// Execution window (minutes).
    pub duration_minutes: u32,
    /// Bucket width (minutes).
    pub bucket_minutes: u32,
    /// Fraction of each bucket's target volume to send.
    pub participation_rate: Decimal,
    /// Per-bucket volume fractions; a U-shaped curve when absent.
    pub volume_profile: Option<Vec<Decimal>>,
    /// Expected market volume over the window. Bucket targets are drawn
    /// from the parent quantity when absent.
    pub expected_market_volume: Option<Decimal>,
    /// Limit price for every slice; market slices when absent.
    pub price_limit: Option<Decimal>,
}

impl VwapParams {
    /// Default bucket width (minutes).
    pub const DEFAULT_BUCKET_MINUTES: u32 = 30;

    /// VWAP with 30-minute buckets and 10% participation.
    #[must_use]
    pub fn new(
        symbol: impl Into<Symbol>,
        side: OrderSide,
        total_amount: Decimal,
        duration_minutes: u32,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            total_amount,
            duration_minutes,
            bucket_minutes: Self::DEFAULT_BUCKET_MINUTES,
            participation_rate: Decimal::new(1, 1),
            volume_profile: None,
            expected_market_volume: None,
            price_limit: None,
        }
    }

    /// Override the participation rate.
    #[must_use]
    pub const fn with_participation(mut self, rate: Decimal) -> Self {
        self.participation_rate = rate;
        self
    }

    /// Supply a historical volume curve.
    #[must_use]
    pub fn with_volume_profile(mut self, profile: Vec<Decimal>) -> Self {
        self.volume_profile = Some(profile);
        self
    }

    /// Size buckets from expected market volume.
    #[must_use]
    pub const fn with_expected_market_volume(mut self, volume: Decimal) -> Self {
        self.expected_market_volume = Some(volume);
        self
    }

    /// Use limit slices at `price`.
    #[must_use]
    pub const fn with_price_limit(mut self, price: Decimal) -> Self {
        self.price_limit = Some(price);
        self
    }

    /// Number of buckets: `max(1, duration / bucket)`.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        let buckets = self.duration_minutes / self.bucket_minutes.max(1);
        usize::try_from(buckets).unwrap_or(usize::MAX).max(1)
    }

    /// Validate the parameters.
    pub fn validate(&self) -> Result<(), TacticError> {
        validate_common(&self.symbol, self.total_amount, self.price_limit)?;
        if self.duration_minutes == 0 || self.bucket_minutes == 0 {
            return Err(TacticError::invalid(
                "duration_minutes and bucket_minutes must be positive",
            ));
        }
        if self.participation_rate <= Decimal::ZERO || self.participation_rate > Decimal::ONE {
            return Err(TacticError::invalid("participation_rate must be in (0, 1]"));
        }
        if let Some(profile) = &self.volume_profile {
            if profile.len() != self.bucket_count() {
                return Err(TacticError::invalid(format!(
                    "volume profile has {} buckets, expected {}",
                    profile.len(),
                    self.bucket_count()
                )));
            }
            if profile.iter().any(|w| *w < Decimal::ZERO)
                || profile.iter().copied().sum::<Decimal>() <= Decimal::ZERO
            {
                return Err(TacticError::invalid(
                    "volume profile weights must be non-negative with a positive sum",
                ));
            }
        }
        if self
            .expected_market_volume
            .is_some_and(|v| v <= Decimal::ZERO)
        {
            return Err(TacticError::invalid("expected_market_volume must be positive"));
        }
        Ok(())
    }
}

/// Parameters for a percentage-of-volume execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PovParams {
    /// Symbol to execute.
    pub symbol: Symbol,
    /// Side of the parent order.
    pub side: OrderSide,
    /// Parent order quantity.
    pub total_amount: Decimal,
    /// Fraction of observed volume to send.
    pub target_participation: Decimal,
    /// Minimum seconds between slices.
    pub min_interval_seconds: u32,
    /// Window after which no further slices are generated (minutes).
    pub max_duration_minutes: u32,
    /// Limit price for every slice; market slices when absent.
    pub price_limit: Option<Decimal>,
}

impl PovParams {
    /// POV at 5% participation, 60 s spacing, 8 hour window.
    #[must_use]
    pub fn new(symbol: impl Into<Symbol>, side: OrderSide, total_amount: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            total_amount,
            target_participation: Decimal::new(5, 2),
            min_interval_seconds: 60,
            max_duration_minutes: 480,
            price_limit: None,
        }
    }

    /// Override the participation target.
    #[must_use]
    pub const fn with_participation(mut self, rate: Decimal) -> Self {
        self.target_participation = rate;
        self
    }

    /// Override the minimum slice spacing.
    #[must_use]
    pub const fn with_min_interval(mut self, seconds: u32) -> Self {
        self.min_interval_seconds = seconds;
        self
    }

    /// Validate the parameters.
    pub fn validate(&self) -> Result<(), TacticError> {
        validate_common(&self.symbol, self.total_amount, self.price_limit)?;
        if self.target_participation <= Decimal::ZERO || self.target_participation > Decimal::ONE
        {
            return Err(TacticError::invalid("target_participation must be in (0, 1]"));
        }
        if self.max_duration_minutes == 0 {
            return Err(TacticError::invalid("max_duration_minutes must be positive"));
        }
        Ok(())
    }
}

fn validate_common(
    symbol: &Symbol,
    total_amount: Decimal,
    price_limit: Option<Decimal>,
) -> Result<(), TacticError> {
    if symbol.is_empty() {
        return Err(TacticError::invalid("symbol must not be empty"));
    }
    if total_amount <= Decimal::ZERO {
        return Err(TacticError::invalid("total_amount must be positive"));
    }
    if price_limit.is_some_and(|p| p <= Decimal::ZERO) {
        return Err(TacticError::invalid("price_limit must be positive"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    #[test_case(10, 60, 10 ; "ten one-minute slices")]
    #[test_case(60, 300, 12 ; "five-minute slices over an hour")]
    #[test_case(1, 120, 1 ; "interval longer than window")]
    #[test_case(7, 60, 7 ; "exact minutes")]
    fn twap_slice_count(duration: u32, interval: u32, expected: usize) {
        let params = TwapParams::new("BTC/USDT", OrderSide::Buy, dec!(1), duration, interval);
        assert_eq!(params.slice_count(), expected);
    }

    #[test_case(240, 8)]
    #[test_case(20, 1)]
    #[test_case(90, 3)]
    fn vwap_bucket_count(duration: u32, expected: usize) {
        let params = VwapParams::new("BTC/USDT", OrderSide::Buy, dec!(1), duration);
        assert_eq!(params.bucket_count(), expected);
    }

    #[test]
    fn twap_rejects_zero_interval() {
        let params = TwapParams::new("BTC/USDT", OrderSide::Buy, dec!(1), 10, 0);
        assert!(params.validate().is_err());
    }

    #[test]
    fn vwap_rejects_profile_length_mismatch() {
        let params = VwapParams::new("BTC/USDT", OrderSide::Sell, dec!(1), 60)
            .with_volume_profile(vec![dec!(1)]);
        assert!(params.validate().is_err());
    }

    #[test]
    fn pov_defaults() {
        let params = PovParams::new("ETH/USDT", OrderSide::Buy, dec!(5));
        assert_eq!(params.target_participation, dec!(0.05));
        assert_eq!(params.min_interval_seconds, 60);
        assert_eq!(params.max_duration_minutes, 480);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn params_serde_roundtrip() {
        let params = VwapParams::new("BTC/USDT", OrderSide::Buy, dec!(3), 120)
            .with_participation(dec!(0.2));
        let json = serde_json::to_string(&params).unwrap();
        let parsed: VwapParams = serde_json::from_str(&json).unwrap();
        assert_eq!(params, parsed);
    }
}
