//! Pre-planned slice schedule shared by TWAP and VWAP.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};

use super::child_order::ChildTemplate;
use crate::domain::execution_tactics::errors::TacticError;
use crate::domain::execution_tactics::value_objects::{AlgoPerformance, AlgoStatus, PlannedSlice};
use crate::domain::order_execution::Order;

/// Slices are handed out in order; each is sent at most once.
#[derive(Debug, Clone)]
pub(super) struct SliceSchedule {
    template: ChildTemplate,
    slices: Vec<PlannedSlice>,
    next_unsent: usize,
    filled_slices: usize,
    status: AlgoStatus,
    performance: AlgoPerformance,
}

impl SliceSchedule {
    pub fn new(template: ChildTemplate, slices: Vec<PlannedSlice>, total: Decimal) -> Self {
        let performance = AlgoPerformance::new(
            template.execution_id.clone(),
            template.kind,
            total,
            template.price_limit.unwrap_or(Decimal::ZERO),
        );
        Self {
            template,
            slices,
            next_unsent: 0,
            filled_slices: 0,
            status: AlgoStatus::Pending,
            performance,
        }
    }

    pub const fn template(&self) -> &ChildTemplate {
        &self.template
    }

    pub fn slices(&self) -> &[PlannedSlice] {
        &self.slices
    }

    pub const fn status(&self) -> AlgoStatus {
        self.status
    }

    pub const fn performance(&self) -> &AlgoPerformance {
        &self.performance
    }

    pub const fn slices_sent(&self) -> usize {
        self.next_unsent
    }

    pub const fn slices_filled(&self) -> usize {
        self.filled_slices
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), TacticError> {
        self.require(AlgoStatus::Pending, "start")?;
        self.status = AlgoStatus::Running;
        self.performance.start_time = Some(now);
        info!(
            execution_id = %self.template.execution_id,
            algorithm = %self.template.kind,
            slices = self.slices.len(),
            "Execution started"
        );
        Ok(())
    }

    /// Next unsent slice regardless of its due time.
    pub fn next_slice(&mut self) -> Result<Option<Order>, TacticError> {
        self.require(AlgoStatus::Running, "generate a slice for")?;
        self.emit_next()
    }

    /// Next unsent slice if it is due at `now`.
    pub fn poll_due(&mut self, now: DateTime<Utc>) -> Result<Option<Order>, TacticError> {
        if self.status != AlgoStatus::Running {
            return Ok(None);
        }
        let Some(start) = self.performance.start_time else {
            return Ok(None);
        };
        match self.slices.get(self.next_unsent) {
            Some(slice) if slice.due_at(start) <= now => self.emit_next(),
            _ => Ok(None),
        }
    }

    /// Record a slice fill; returns the next unsent slice while running.
    pub fn on_slice_filled(
        &mut self,
        quantity: Decimal,
        price: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, TacticError> {
        if !matches!(self.status, AlgoStatus::Running | AlgoStatus::Paused) {
            return Err(TacticError::InvalidState {
                status: self.status,
                action: "record a fill for",
            });
        }

        self.performance.record_fill(quantity, price);
        self.filled_slices += 1;

        if self.filled_slices >= self.slices.len()
            || self.performance.executed_amount >= self.performance.total_amount
        {
            self.status = AlgoStatus::Completed;
            self.performance.end_time = Some(now);
            info!(
                execution_id = %self.template.execution_id,
                algorithm = %self.template.kind,
                average_price = %self.performance.average_price,
                "Execution completed"
            );
            return Ok(None);
        }

        if self.status == AlgoStatus::Paused {
            return Ok(None);
        }
        self.emit_next()
    }

    pub fn pause(&mut self) -> Result<(), TacticError> {
        self.require(AlgoStatus::Running, "pause")?;
        self.status = AlgoStatus::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), TacticError> {
        self.require(AlgoStatus::Paused, "resume")?;
        self.status = AlgoStatus::Running;
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), TacticError> {
        self.finish(AlgoStatus::Cancelled, now, "cancel")
    }

    pub fn fail(&mut self, now: DateTime<Utc>) -> Result<(), TacticError> {
        self.finish(AlgoStatus::Error, now, "fail")
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
        info!(
            execution_id = %self.template.execution_id,
            status = %to,
            "Execution stopped"
        );
        Ok(())
    }

    fn emit_next(&mut self) -> Result<Option<Order>, TacticError> {
        let Some(slice) = self.slices.get(self.next_unsent) else {
            return Ok(None);
        };
        let total = self.slices.len();
        let kind = self.template.kind.as_str();
        let slice_key = format!("{kind}_slice");
        let total_key = format!("{kind}_total_slices");
        let order = self.template.build(
            slice.amount,
            &[
                (slice_key.as_str(), (slice.index + 1).into()),
                (total_key.as_str(), total.into()),
            ],
        )?;
        self.next_unsent += 1;
        self.performance.record_placed();
        debug!(
            execution_id = %self.template.execution_id,
            slice = slice.index + 1,
            total,
            amount = %slice.amount,
            "Slice emitted"
        );
        Ok(Some(order))
    }

    fn require(&self, expected: AlgoStatus, action: &'static str) -> Result<(), TacticError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(TacticError::InvalidState {
                status: self.status,
                action,
            })
        }
    }
}
