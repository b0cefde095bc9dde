//! Breakout strategy.
//!
//! BUY when the close clears the prior `lookback`-bar high by
//! `min_breakout`; SELL when it breaks the prior low by the same margin.
//! Optionally requires volume above `volume_factor` times its rolling mean.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::signal::{Signal, SignalKind};
use super::SignalSource;
use crate::domain::shared::{Candle, Symbol};

/// Breakout parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakoutConfig {
    /// Bars in the support/resistance window.
    pub lookback: usize,
    /// Require a volume spike.
    pub volume_confirm: bool,
    /// Volume must exceed the rolling mean by this factor.
    pub volume_factor: Decimal,
    /// Fractional margin beyond the level, e.g. `0.01` for 1%.
    pub min_breakout: Decimal,
    /// Confidence attached to signals.
    pub confidence: Decimal,
}

impl Default for BreakoutConfig {
    fn default() -> Self {
        Self {
            lookback: 20,
            volume_confirm: true,
            volume_factor: Decimal::new(12, 1),
            min_breakout: Decimal::new(1, 2),
            confidence: Decimal::new(7, 1),
        }
    }
}

/// Support/resistance breakout signal source.
#[derive(Debug, Clone, Default)]
pub struct BreakoutStrategy {
    config: BreakoutConfig,
}

impl BreakoutStrategy {
    /// Create with the given parameters.
    #[must_use]
    pub const fn new(config: BreakoutConfig) -> Self {
        Self { config }
    }

    /// Parameters.
    #[must_use]
    pub const fn config(&self) -> &BreakoutConfig {
        &self.config
    }
}

impl SignalSource for BreakoutStrategy {
    fn name(&self) -> &str {
        "breakout"
    }

    fn generate_signals(&mut self, symbol: &Symbol, window: &[Candle]) -> Vec<Signal> {
        let lookback = self.config.lookback.max(1);
        let Some((current, history)) = window.split_last() else {
            return Vec::new();
        };
        if history.len() < lookback {
            return Vec::new();
        }

        let prior = &history[history.len() - lookback..];
        let resistance = prior.iter().map(|c| c.high).max().unwrap_or(Decimal::ZERO);
        let support = prior.iter().map(|c| c.low).min().unwrap_or(Decimal::ZERO);

        let recent = &window[window.len() - lookback..];
        let avg_volume =
            recent.iter().map(|c| c.volume).sum::<Decimal>() / Decimal::from(recent.len());
        let volume_ok = !self.config.volume_confirm
            || current.volume > avg_volume * self.config.volume_factor;
        if !volume_ok {
            return Vec::new();
        }

        let margin = self.config.min_breakout;
        let (kind, level_key, level) = if current.close > resistance * (Decimal::ONE + margin) {
            (SignalKind::Buy, "resistance", resistance)
        } else if current.close < support * (Decimal::ONE - margin) {
            (SignalKind::Sell, "support", support)
        } else {
            return Vec::new();
        };

        let mut signal = Signal::new(kind, symbol.clone(), current.close, current.time)
            .with_confidence(self.config.confidence)
            .with_meta(level_key, level.to_string())
            .with_meta("strategy", "breakout");
        if avg_volume > Decimal::ZERO {
            signal = signal.with_meta("volume_ratio", (current.volume / avg_volume).round_dp(4).to_string());
        }
        vec![signal]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn bars(closes: &[Decimal], last_volume: Decimal) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| {
                let volume = if i + 1 == closes.len() { last_volume } else { dec!(100) };
                Candle::new(
                    start + TimeDelta::hours(i as i64),
                    *close,
                    *close + dec!(1),
                    *close - dec!(1),
                    *close,
                    volume,
                )
            })
            .collect()
    }

    fn strategy(lookback: usize) -> BreakoutStrategy {
        BreakoutStrategy::new(BreakoutConfig {
            lookback,
            ..BreakoutConfig::default()
        })
    }

    #[test]
    fn needs_full_lookback() {
        let window = bars(&[dec!(100), dec!(100), dec!(150)], dec!(1000));
        assert!(strategy(3).generate_signals(&Symbol::new("BTC/USDT"), &window).is_empty());
    }

    #[test]
    fn breakout_with_volume_buys() {
        let window = bars(&[dec!(100), dec!(100), dec!(100), dec!(110)], dec!(1000));
        let signals = strategy(3).generate_signals(&Symbol::new("BTC/USDT"), &window);

        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, SignalKind::Buy);
        assert_eq!(signals[0].price, dec!(110));
        assert_eq!(signals[0].confidence, dec!(0.7));
    }

    #[test]
    fn breakdown_sells() {
        let window = bars(&[dec!(100), dec!(100), dec!(100), dec!(90)], dec!(1000));
        let signals = strategy(3).generate_signals(&Symbol::new("BTC/USDT"), &window);
        assert_eq!(signals[0].kind, SignalKind::Sell);
    }

    #[test]
    fn quiet_volume_is_ignored() {
        let window = bars(&[dec!(100), dec!(100), dec!(100), dec!(110)], dec!(100));
        assert!(strategy(3).generate_signals(&Symbol::new("BTC/USDT"), &window).is_empty());
    }
}
