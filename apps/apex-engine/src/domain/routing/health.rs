//! Per-venue latency window and reliability score.

use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::time::Duration;

/// Rolling health statistics for one venue.
///
/// Reliability lives in `[floor, 1]`: multiplied by the decay factor on a
/// failed data fetch and by the boost factor (capped at 1) on a successful
/// placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueHealth {
    latencies: VecDeque<Duration>,
    window: usize,
    reliability: Decimal,
}

impl VenueHealth {
    /// Fresh statistics with full reliability.
    #[must_use]
    pub fn new(window: usize) -> Self {
        Self {
            latencies: VecDeque::with_capacity(window),
            window: window.max(1),
            reliability: Decimal::ONE,
        }
    }

    /// Current reliability score.
    #[must_use]
    pub const fn reliability(&self) -> Decimal {
        self.reliability
    }

    /// Number of latency samples held.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.latencies.len()
    }

    /// Push a latency sample, evicting the oldest beyond the window.
    pub fn record_latency(&mut self, latency: Duration) {
        if self.latencies.len() == self.window {
            self.latencies.pop_front();
        }
        self.latencies.push_back(latency);
    }

    /// Mean latency over the window.
    #[must_use]
    pub fn average_latency(&self) -> Option<Duration> {
        let count = u32::try_from(self.latencies.len()).ok().filter(|c| *c > 0)?;
        let total: Duration = self.latencies.iter().sum();
        Some(total / count)
    }

    /// Decay reliability after a failed data fetch.
    pub fn record_failure(&mut self, decay: Decimal, floor: Decimal) {
        self.reliability = (self.reliability * decay).max(floor);
    }

    /// Boost reliability after a successful placement.
    pub fn record_success(&mut self, boost: Decimal) {
        self.reliability = (self.reliability * boost).min(Decimal::ONE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn latency_window_is_bounded() {
        let mut health = VenueHealth::new(3);
        for ms in [10, 20, 30, 40] {
            health.record_latency(Duration::from_millis(ms));
        }
        assert_eq!(health.sample_count(), 3);
        assert_eq!(health.average_latency(), Some(Duration::from_millis(30)));
    }

    #[test]
    fn no_samples_no_average() {
        assert_eq!(VenueHealth::new(100).average_latency(), None);
    }

    #[test]
    fn reliability_decays_to_floor_and_caps_at_one() {
        let mut health = VenueHealth::new(100);
        health.record_failure(dec!(0.9), dec!(0.1));
        assert_eq!(health.reliability(), dec!(0.9));
        for _ in 0..50 {
            health.record_failure(dec!(0.9), dec!(0.1));
        }
        assert_eq!(health.reliability(), dec!(0.1));
        for _ in 0..100 {
            health.record_success(dec!(1.05));
        }
        assert_eq!(health.reliability(), Decimal::ONE);
    }
}
