//! Child order construction shared by all slicers.

use rust_decimal::Decimal;

use crate::domain::execution_tactics::errors::TacticError;
use crate::domain::execution_tactics::value_objects::AlgoKind;
use crate::domain::order_execution::{Order, OrderRequest, OrderSide};
use crate::domain::shared::{ExecutionId, Symbol};

/// Decimal places kept on child order quantities.
pub(super) const AMOUNT_DP: u32 = 8;

/// Common fields every child order of an execution shares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct ChildTemplate {
    pub execution_id: ExecutionId,
    pub kind: AlgoKind,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub price_limit: Option<Decimal>,
}

impl ChildTemplate {
    /// Build a child order: limit when a price limit is set, market otherwise.
    pub fn build(
        &self,
        amount: Decimal,
        tags: &[(&str, serde_json::Value)],
    ) -> Result<Order, TacticError> {
        let request = match self.price_limit {
            Some(price) => OrderRequest::limit(self.symbol.clone(), self.side, amount, price),
            None => OrderRequest::market(self.symbol.clone(), self.side, amount),
        };
        let request = tags.iter().fold(
            request
                .with_meta("algorithm", self.kind.as_str())
                .with_meta("parent_execution", self.execution_id.as_str()),
            |req, (key, value)| req.with_meta(key, value.clone()),
        );
        Ok(Order::new(request)?)
    }
}
