//! POV Executor Service
//!
//! Sizes each child order from market volume observed since the previous
//! slice. A slice is proposed only when both hold: at least
//! `min_interval_seconds` have passed since the last slice, and the observed
//! volume yields a positive quantity.

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::VecDeque;
use tracing::{debug, info};

use super::child_order::{AMOUNT_DP, ChildTemplate};
use crate::domain::execution_tactics::errors::TacticError;
use crate::domain::execution_tactics::value_objects::{
    AlgoKind, AlgoPerformance, AlgoStatus, PovParams,
};
use crate::domain::order_execution::Order;
use crate::domain::shared::ExecutionId;

/// Volume samples kept for inspection.
const VOLUME_HISTORY: usize = 100;

/// POV executor.
#[derive(Debug, Clone)]
pub struct PovExecutor {
    params: PovParams,
    template: ChildTemplate,
    status: AlgoStatus,
    performance: AlgoPerformance,
    last_slice_at: Option<DateTime<Utc>>,
    slices_sent: usize,
    volume_history: VecDeque<(DateTime<Utc>, Decimal)>,
}

impl PovExecutor {
    /// Create a POV execution.
    pub fn new(id: ExecutionId, params: PovParams) -> Result<Self, TacticError> {
        params.validate()?;
        let template = ChildTemplate {
            execution_id: id.clone(),
            kind: AlgoKind::Pov,
            symbol: params.symbol.clone(),
            side: params.side,
            price_limit: params.price_limit,
        };
        let performance = AlgoPerformance::new(
            id,
            AlgoKind::Pov,
            params.total_amount,
            params.price_limit.unwrap_or(Decimal::ZERO),
        );
        Ok(Self {
            params,
            template,
            status: AlgoStatus::Pending,
            performance,
            last_slice_at: None,
            slices_sent: 0,
            volume_history: VecDeque::with_capacity(VOLUME_HISTORY),
        })
    }

    /// Execution identifier.
    #[must_use]
    pub const fn id(&self) -> &ExecutionId {
        &self.template.execution_id
    }

    /// Parameters.
    #[must_use]
    pub const fn params(&self) -> &PovParams {
        &self.params
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> AlgoStatus {
        self.status
    }

    /// Running performance.
    #[must_use]
    pub const fn performance(&self) -> &AlgoPerformance {
        &self.performance
    }

    /// Number of slices proposed so far.
    #[must_use]
    pub const fn slices_sent(&self) -> usize {
        self.slices_sent
    }

    /// Recent volume samples, oldest first.
    pub fn volume_history(&self) -> impl Iterator<Item = &(DateTime<Utc>, Decimal)> {
        self.volume_history.iter()
    }

    /// True once `max_duration_minutes` have elapsed since start.
    #[must_use]
    pub fn is_window_ended(&self, now: DateTime<Utc>) -> bool {
        self.performance.start_time.is_some_and(|start| {
            now - start >= TimeDelta::minutes(i64::from(self.params.max_duration_minutes))
        })
    }

    /// Move from PENDING to RUNNING.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), TacticError> {
        if self.status != AlgoStatus::Pending {
            return Err(TacticError::InvalidState {
                status: self.status,
                action: "start",
            });
        }
        self.status = AlgoStatus::Running;
        self.performance.start_time = Some(now);
        info!(
            execution_id = %self.template.execution_id,
            target = %self.params.target_participation,
            "POV execution started"
        );
        Ok(())
    }

    /// Propose a child order from volume observed since the last slice.
    ///
    /// Returns `None` while paused, inside the minimum interval, after the
    /// window has ended, or when the observed volume yields nothing to send.
    pub fn calculate_next_slice(
        &mut self,
        observed_volume: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, TacticError> {
        if self.status != AlgoStatus::Running {
            return Ok(None);
        }

        if self.volume_history.len() == VOLUME_HISTORY {
            self.volume_history.pop_front();
        }
        self.volume_history.push_back((now, observed_volume));

        if self.is_window_ended(now) {
            debug!(execution_id = %self.template.execution_id, "POV window ended");
            return Ok(None);
        }

        let min_interval = TimeDelta::seconds(i64::from(self.params.min_interval_seconds));
        if self.last_slice_at.is_some_and(|last| now - last < min_interval) {
            return Ok(None);
        }

        let amount = (observed_volume * self.params.target_participation)
            .round_dp_with_strategy(AMOUNT_DP, RoundingStrategy::ToZero)
            .min(self.performance.remaining());
        if amount <= Decimal::ZERO {
            return Ok(None);
        }

        let number = self.slices_sent + 1;
        let order = self.template.build(
            amount,
            &[
                ("pov_slice", number.into()),
                (
                    "pov_executed",
                    self.performance.executed_amount.to_string().into(),
                ),
            ],
        )?;
        self.slices_sent = number;
        self.last_slice_at = Some(now);
        self.performance.record_placed();
        debug!(
            execution_id = %self.template.execution_id,
            amount = %amount,
            observed_volume = %observed_volume,
            "POV slice proposed"
        );
        Ok(Some(order))
    }

    /// Record a fill; completes once the total is executed.
    pub fn on_slice_filled(
        &mut self,
        quantity: Decimal,
        price: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(), TacticError> {
        if !matches!(self.status, AlgoStatus::Running | AlgoStatus::Paused) {
            return Err(TacticError::InvalidState {
                status: self.status,
                action: "record a fill for",
            });
        }
        self.performance.record_fill(quantity, price);
        if self.performance.executed_amount >= self.performance.total_amount {
            self.status = AlgoStatus::Completed;
            self.performance.end_time = Some(now);
            info!(
                execution_id = %self.template.execution_id,
                average_price = %self.performance.average_price,
                "POV execution completed"
            );
        }
        Ok(())
    }

    /// Stop proposing slices until resumed.
    pub fn pause(&mut self) -> Result<(), TacticError> {
        self.transition(AlgoStatus::Running, AlgoStatus::Paused, "pause")
    }

    /// Resume after a pause.
    pub fn resume(&mut self) -> Result<(), TacticError> {
        self.transition(AlgoStatus::Paused, AlgoStatus::Running, "resume")
    }

    /// Cancel; already-sent slices are left to the caller.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), TacticError> {
        self.finish(AlgoStatus::Cancelled, now, "cancel")
    }

    /// Mark the execution failed.
    pub fn fail(&mut self, now: DateTime<Utc>) -> Result<(), TacticError> {
        self.finish(AlgoStatus::Error, now, "fail")
    }

    fn transition(
        &mut self,
        from: AlgoStatus,
        to: AlgoStatus,
        action: &'static str,
    ) -> Result<(), TacticError> {
        if self.status != from {
            return Err(TacticError::InvalidState {
                status: self.status,
                action,
            });
        }
        self.status = to;
        Ok(())
    }

    fn finish(
        &mut self,
        to: AlgoStatus,
        now: DateTime<Utc>,
        action: &'static str,
    ) -> Result<(), TacticError> {
        if self.status.is_terminal() {
            return Err(TacticError::InvalidState {
                status: self.status,
                action,
            });
        }
        self.status = to;
        self.performance.end_time = Some(now);
        Ok(())
    }
}
