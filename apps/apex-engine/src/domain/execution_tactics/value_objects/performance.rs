//! Running performance aggregate of an execution algorithm.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::algo_status::AlgoKind;
use crate::domain::shared::ExecutionId;

const BPS: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// Volume-weighted fill price, completion and counts for one execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgoPerformance {
    /// Execution the figures belong to.
    pub execution_id: ExecutionId,
    /// Algorithm kind.
    pub algorithm: AlgoKind,
    /// Benchmark price; zero when none was given.
    pub target_price: Decimal,
    /// Volume-weighted average executed price.
    pub average_price: Decimal,
    /// Quantity executed so far.
    pub executed_amount: Decimal,
    /// Parent order quantity.
    pub total_amount: Decimal,
    /// `executed / total * 100`.
    pub completion_percent: Decimal,
    /// Child orders generated.
    pub orders_placed: u32,
    /// Child order fills recorded.
    pub orders_filled: u32,
    /// When the execution started.
    pub start_time: Option<DateTime<Utc>>,
    /// When the execution finished or was cancelled.
    pub end_time: Option<DateTime<Utc>>,
}

impl AlgoPerformance {
    /// Empty aggregate for a new execution.
    #[must_use]
    pub const fn new(
        execution_id: ExecutionId,
        algorithm: AlgoKind,
        total_amount: Decimal,
        target_price: Decimal,
    ) -> Self {
        Self {
            execution_id,
            algorithm,
            target_price,
            average_price: Decimal::ZERO,
            executed_amount: Decimal::ZERO,
            total_amount,
            completion_percent: Decimal::ZERO,
            orders_placed: 0,
            orders_filled: 0,
            start_time: None,
            end_time: None,
        }
    }

    /// Count a generated child order.
    pub const fn record_placed(&mut self) {
        self.orders_placed += 1;
    }

    /// Fold a fill into the running average.
    ///
    /// `avg' = (avg * prev + price * qty) / (prev + qty)`
    pub fn record_fill(&mut self, quantity: Decimal, price: Decimal) {
        let new_volume = self.executed_amount + quantity;
        if new_volume > Decimal::ZERO {
            self.average_price =
                (self.average_price * self.executed_amount + price * quantity) / new_volume;
        }
        self.executed_amount = new_volume;
        self.orders_filled += 1;
        if self.total_amount > Decimal::ZERO {
            self.completion_percent = self.executed_amount / self.total_amount * Decimal::ONE_HUNDRED;
        }
    }

    /// `(avg - target) / target * 10000`; zero without a target.
    #[must_use]
    pub fn slippage_bps(&self) -> Decimal {
        if self.target_price.is_zero() {
            return Decimal::ZERO;
        }
        (self.average_price - self.target_price) / self.target_price * BPS
    }

    /// Quantity still to execute.
    #[must_use]
    pub fn remaining(&self) -> Decimal {
        (self.total_amount - self.executed_amount).max(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn perf(target: Decimal) -> AlgoPerformance {
        AlgoPerformance::new(ExecutionId::new("exe-1"), AlgoKind::Twap, dec!(10), target)
    }

    #[test]
    fn running_average_is_volume_weighted() {
        let mut p = perf(dec!(100));
        p.record_fill(dec!(2), dec!(100));
        p.record_fill(dec!(3), dec!(110));
        assert_eq!(p.average_price, dec!(106));
        assert_eq!(p.completion_percent, dec!(50));
        assert_eq!(p.orders_filled, 2);
        assert_eq!(p.remaining(), dec!(5));
    }

    #[test]
    fn slippage_in_basis_points() {
        let mut p = perf(dec!(100));
        p.record_fill(dec!(1), dec!(100.5));
        assert_eq!(p.slippage_bps(), dec!(50));
    }

    #[test]
    fn slippage_zero_without_target() {
        let mut p = perf(Decimal::ZERO);
        p.record_fill(dec!(1), dec!(100.5));
        assert_eq!(p.slippage_bps(), Decimal::ZERO);
    }
}
