//! TWAP Executor Service
//!
//! Splits a parent order into `max(1, duration / interval)` equal slices.
//! Slice sizes are rounded toward zero and the final slice absorbs the
//! remainder, so the plan always sums exactly to the parent quantity.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use super::child_order::{AMOUNT_DP, ChildTemplate};
use super::slice_schedule::SliceSchedule;
use crate::domain::execution_tactics::errors::TacticError;
use crate::domain::execution_tactics::value_objects::{
    AlgoKind, AlgoPerformance, AlgoStatus, PlannedSlice, TwapParams,
};
use crate::domain::order_execution::Order;
use crate::domain::shared::ExecutionId;

/// TWAP executor.
#[derive(Debug, Clone)]
pub struct TwapExecutor {
    params: TwapParams,
    schedule: SliceSchedule,
}

impl TwapExecutor {
    /// Plan a TWAP execution.
    pub fn new(id: ExecutionId, params: TwapParams) -> Result<Self, TacticError> {
        params.validate()?;
        let slices = plan_slices(&params);
        Ok(Self::from_plan(id, params, slices))
    }

    /// Wrap an already planned schedule.
    pub(crate) fn from_plan(id: ExecutionId, params: TwapParams, slices: Vec<PlannedSlice>) -> Self {
        let template = ChildTemplate {
            execution_id: id,
            kind: AlgoKind::Twap,
            symbol: params.symbol.clone(),
            side: params.side,
            price_limit: params.price_limit,
        };
        let schedule = SliceSchedule::new(template, slices, params.total_amount);
        Self { params, schedule }
    }

    /// Execution identifier.
    #[must_use]
    pub const fn id(&self) -> &ExecutionId {
        &self.schedule.template().execution_id
    }

    /// Parameters the plan was built from.
    #[must_use]
    pub const fn params(&self) -> &TwapParams {
        &self.params
    }

    /// The full slice plan.
    #[must_use]
    pub fn slices(&self) -> &[PlannedSlice] {
        self.schedule.slices()
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> AlgoStatus {
        self.schedule.status()
    }

    /// Running performance.
    #[must_use]
    pub const fn performance(&self) -> &AlgoPerformance {
        self.schedule.performance()
    }

    /// Number of slices handed out.
    #[must_use]
    pub const fn slices_sent(&self) -> usize {
        self.schedule.slices_sent()
    }

    /// Number of slice fills recorded.
    #[must_use]
    pub const fn slices_filled(&self) -> usize {
        self.schedule.slices_filled()
    }

    /// Move from PENDING to RUNNING.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), TacticError> {
        self.schedule.start(now)
    }

    /// Hand out the next unsent slice.
    pub fn next_slice(&mut self) -> Result<Option<Order>, TacticError> {
        self.schedule.next_slice()
    }

    /// Hand out the next slice if its scheduled time has come.
    pub fn poll_due(&mut self, now: DateTime<Utc>) -> Result<Option<Order>, TacticError> {
        self.schedule.poll_due(now)
    }

    /// Record a slice fill and return the next unsent slice.
    pub fn on_slice_filled(
        &mut self,
        quantity: Decimal,
        price: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, TacticError> {
        self.schedule.on_slice_filled(quantity, price, now)
    }

    /// Stop generating slices until resumed.
    pub fn pause(&mut self) -> Result<(), TacticError> {
        self.schedule.pause()
    }

    /// Resume after a pause.
    pub fn resume(&mut self) -> Result<(), TacticError> {
        self.schedule.resume()
    }

    /// Cancel; already-sent slices are left to the caller.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), TacticError> {
        self.schedule.cancel(now)
    }

    /// Mark the execution failed.
    pub fn fail(&mut self, now: DateTime<Utc>) -> Result<(), TacticError> {
        self.schedule.fail(now)
    }
}

fn plan_slices(params: &TwapParams) -> Vec<PlannedSlice> {
    let mut count = params.slice_count();
    let total = params.total_amount;
    let mut size = (total / Decimal::from(count))
        .round_dp_with_strategy(AMOUNT_DP, RoundingStrategy::ToZero);
    if size.is_zero() {
        count = 1;
        size = total;
    }

    let interval = i64::from(params.interval_seconds);
    let last = count - 1;
    let last_size = total - size * Decimal::from(last);

    (0..count)
        .map(|i| {
            let amount = if i == last { last_size } else { size };
            PlannedSlice::new(i, amount, interval * i64::try_from(i).unwrap_or(i64::MAX))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::{OrderSide, OrderType};
    use chrono::TimeDelta;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn executor(total: Decimal, minutes: u32, interval: u32) -> TwapExecutor {
        TwapExecutor::new(
            ExecutionId::new("exe-twap"),
            TwapParams::new("BTC/USDT", OrderSide::Buy, total, minutes, interval),
        )
        .unwrap()
    }

    #[test]
    fn hundred_over_ten_minutes_scenario() {
        let now = Utc::now();
        let mut twap = executor(dec!(100), 10, 60);
        assert_eq!(twap.slices().len(), 10);
        assert!(twap.slices().iter().all(|s| s.amount == dec!(10)));

        twap.start(now).unwrap();
        let first = twap.next_slice().unwrap().unwrap();
        assert_eq!(first.amount(), dec!(10));

        for _ in 0..9 {
            twap.on_slice_filled(dec!(10), dec!(50000), now).unwrap();
        }
        assert_eq!(twap.status(), AlgoStatus::Running);
        assert_eq!(twap.performance().executed_amount, dec!(90));

        let next = twap.on_slice_filled(dec!(10), dec!(50000), now).unwrap();
        assert!(next.is_none());
        assert_eq!(twap.status(), AlgoStatus::Completed);
        assert_eq!(twap.performance().completion_percent, dec!(100));
        assert_eq!(twap.performance().end_time, Some(now));
    }

    #[test]
    fn last_slice_absorbs_remainder() {
        let twap = executor(dec!(100), 3, 60);
        let sizes: Vec<_> = twap.slices().iter().map(|s| s.amount).collect();
        assert_eq!(sizes[0], dec!(33.33333333));
        assert_eq!(sizes[2], dec!(33.33333334));
        assert_eq!(sizes.iter().copied().sum::<Decimal>(), dec!(100));
    }

    #[test]
    fn child_orders_carry_parentage() {
        let mut twap = executor(dec!(4), 4, 60);
        twap.start(Utc::now()).unwrap();
        let order = twap.next_slice().unwrap().unwrap();
        assert_eq!(order.order_type(), OrderType::Market);
        assert_eq!(order.meta("twap_slice"), Some(&1.into()));
        assert_eq!(order.meta("twap_total_slices"), Some(&4.into()));
        assert_eq!(order.meta("parent_execution"), Some(&"exe-twap".into()));
    }

    #[test]
    fn price_limit_makes_limit_slices() {
        let params = TwapParams::new("BTC/USDT", OrderSide::Sell, dec!(2), 2, 60)
            .with_price_limit(dec!(51000));
        let mut twap = TwapExecutor::new(ExecutionId::generate(), params).unwrap();
        twap.start(Utc::now()).unwrap();
        let order = twap.next_slice().unwrap().unwrap();
        assert_eq!(order.order_type(), OrderType::Limit);
        assert_eq!(order.price(), Some(dec!(51000)));
    }

    #[test]
    fn poll_due_respects_schedule() {
        let start = Utc::now();
        let mut twap = executor(dec!(3), 3, 60);
        twap.start(start).unwrap();
        assert!(twap.poll_due(start).unwrap().is_some());
        assert!(twap.poll_due(start + TimeDelta::seconds(30)).unwrap().is_none());
        assert!(twap.poll_due(start + TimeDelta::seconds(60)).unwrap().is_some());
        assert!(twap.poll_due(start + TimeDelta::seconds(600)).unwrap().is_some());
        assert!(twap.poll_due(start + TimeDelta::seconds(900)).unwrap().is_none());
    }

    #[test]
    fn paused_execution_emits_nothing() {
        let now = Utc::now();
        let mut twap = executor(dec!(3), 3, 60);
        twap.start(now).unwrap();
        twap.next_slice().unwrap();
        twap.pause().unwrap();
        assert!(twap.next_slice().is_err());
        assert!(twap.on_slice_filled(dec!(1), dec!(10), now).unwrap().is_none());
        twap.resume().unwrap();
        assert!(twap.next_slice().unwrap().is_some());
    }

    #[test]
    fn cancel_stops_generation() {
        let now = Utc::now();
        let mut twap = executor(dec!(3), 3, 60);
        twap.start(now).unwrap();
        twap.cancel(now).unwrap();
        assert_eq!(twap.status(), AlgoStatus::Cancelled);
        assert!(twap.next_slice().is_err());
        assert!(twap.poll_due(now).unwrap().is_none());
        assert!(twap.cancel(now).is_err());
    }

    #[test]
    fn cannot_slice_before_start() {
        let mut twap = executor(dec!(1), 1, 60);
        assert!(matches!(
            twap.next_slice(),
            Err(TacticError::InvalidState { status: AlgoStatus::Pending, .. })
        ));
    }

    proptest! {
        #[test]
        fn plan_sums_exactly_to_total(
            units in 1i64..1_000_000_000_000,
            scale in 0u32..8,
            minutes in 1u32..600,
            interval in 1u32..3600,
        ) {
            let total = Decimal::new(units, scale);
            let twap = executor(total, minutes, interval);
            let sum: Decimal = twap.slices().iter().map(|s| s.amount).sum();
            prop_assert_eq!(sum, total);
            prop_assert!(twap.slices().iter().all(|s| s.amount > Decimal::ZERO));
        }
    }
}
