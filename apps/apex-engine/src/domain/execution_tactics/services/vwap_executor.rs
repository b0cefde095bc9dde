//! VWAP Executor Service
//!
//! Buckets the window, weights each bucket by an intraday volume curve and
//! sends `bucket_target * participation` per bucket, capped by what is left.
//! Whatever the curve leaves over is folded into the last generated slice so
//! the plan sums exactly to the parent quantity.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use super::child_order::{AMOUNT_DP, ChildTemplate};
use super::slice_schedule::SliceSchedule;
use super::volume_profile::{normalize, u_shaped_profile};
use crate::domain::execution_tactics::errors::TacticError;
use crate::domain::execution_tactics::value_objects::{
    AlgoKind, AlgoPerformance, AlgoStatus, PlannedSlice, VwapParams,
};
use crate::domain::order_execution::Order;
use crate::domain::shared::ExecutionId;

/// VWAP executor.
#[derive(Debug, Clone)]
pub struct VwapExecutor {
    params: VwapParams,
    profile: Vec<Decimal>,
    schedule: SliceSchedule,
}

impl VwapExecutor {
    /// Plan a VWAP execution.
    pub fn new(id: ExecutionId, params: VwapParams) -> Result<Self, TacticError> {
        params.validate()?;
        let buckets = params.bucket_count();
        let profile = params
            .volume_profile
            .as_deref()
            .map_or_else(|| u_shaped_profile(buckets), normalize);
        let slices = plan_slices(&params, &profile);
        let template = ChildTemplate {
            execution_id: id,
            kind: AlgoKind::Vwap,
            symbol: params.symbol.clone(),
            side: params.side,
            price_limit: params.price_limit,
        };
        let schedule = SliceSchedule::new(template, slices, params.total_amount);
        Ok(Self {
            params,
            profile,
            schedule,
        })
    }

    /// Execution identifier.
    #[must_use]
    pub const fn id(&self) -> &ExecutionId {
        &self.schedule.template().execution_id
    }

    /// Parameters the plan was built from.
    #[must_use]
    pub const fn params(&self) -> &VwapParams {
        &self.params
    }

    /// Normalized per-bucket volume fractions.
    #[must_use]
    pub fn profile(&self) -> &[Decimal] {
        &self.profile
    }

    /// The generated slices. Buckets with nothing to send are omitted.
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

    /// Move from PENDING to RUNNING.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), TacticError> {
        self.schedule.start(now)
    }

    /// Hand out the next unsent slice.
    pub fn next_slice(&mut self) -> Result<Option<Order>, TacticError> {
        self.schedule.next_slice()
    }

    /// Hand out the next slice if its bucket has opened.
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

fn plan_slices(params: &VwapParams, profile: &[Decimal]) -> Vec<PlannedSlice> {
    let total = params.total_amount;
    let base = params.expected_market_volume.unwrap_or(total);
    let bucket_seconds = i64::from(params.bucket_minutes) * 60;
    let offset = |bucket: usize| bucket_seconds * i64::try_from(bucket).unwrap_or(i64::MAX);

    let mut remaining = total;
    let mut slices: Vec<PlannedSlice> = Vec::with_capacity(profile.len());
    for (bucket, fraction) in profile.iter().enumerate() {
        let amount = (base * *fraction * params.participation_rate)
            .round_dp_with_strategy(AMOUNT_DP, RoundingStrategy::ToZero)
            .min(remaining);
        if amount > Decimal::ZERO {
            slices.push(PlannedSlice::new(slices.len(), amount, offset(bucket)));
            remaining -= amount;
        }
    }

    if remaining > Decimal::ZERO {
        match slices.last_mut() {
            Some(last) => last.amount += remaining,
            None => {
                let bucket = profile.len().saturating_sub(1);
                slices.push(PlannedSlice::new(0, remaining, offset(bucket)));
            }
        }
    }
    slices
}
