//! Order Aggregate Root
//!
//! Tracks requested, filled and remaining quantity together with the
//! volume-weighted fill price. `remaining = amount - filled` holds after
//! every transition and is never negative.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::value_objects::{OrderSide, OrderStatus, OrderType};
use crate::domain::shared::{Metadata, OrderId, Symbol, VenueOrderId};

/// Command to create a new order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    /// Symbol to trade.
    pub symbol: Symbol,
    /// Order side.
    pub side: OrderSide,
    /// Order type.
    pub order_type: OrderType,
    /// Requested quantity.
    pub amount: Decimal,
    /// Limit price (limit, take-profit, stop-limit).
    pub price: Option<Decimal>,
    /// Trigger price (stop-loss, stop-limit).
    pub stop_price: Option<Decimal>,
    /// Free-form tags such as parent references.
    pub metadata: Metadata,
}

impl OrderRequest {
    /// Market order request.
    #[must_use]
    pub fn market(symbol: impl Into<Symbol>, side: OrderSide, amount: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            amount,
            price: None,
            stop_price: None,
            metadata: Metadata::new(),
        }
    }

    /// Limit order request.
    #[must_use]
    pub fn limit(
        symbol: impl Into<Symbol>,
        side: OrderSide,
        amount: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            order_type: OrderType::Limit,
            price: Some(price),
            ..Self::market(symbol, side, amount)
        }
    }

    /// Set the order type.
    #[must_use]
    pub const fn with_type(mut self, order_type: OrderType) -> Self {
        self.order_type = order_type;
        self
    }

    /// Set the limit price.
    #[must_use]
    pub const fn with_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    /// Set the stop price.
    #[must_use]
    pub const fn with_stop_price(mut self, stop_price: Decimal) -> Self {
        self.stop_price = Some(stop_price);
        self
    }

    /// Attach a metadata entry.
    #[must_use]
    pub fn with_meta(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Validate the command parameters.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.symbol.is_empty() {
            return Err(invalid("symbol", "symbol must not be empty"));
        }
        if self.amount <= Decimal::ZERO {
            return Err(invalid("amount", "amount must be positive"));
        }
        if self.order_type.requires_price() && self.price.is_none() {
            return Err(invalid(
                "price",
                &format!("price required for {} orders", self.order_type),
            ));
        }
        if self.order_type.requires_stop_price() && self.stop_price.is_none() {
            return Err(invalid(
                "stop_price",
                &format!("stop price required for {} orders", self.order_type),
            ));
        }
        if self.price.is_some_and(|p| p <= Decimal::ZERO) {
            return Err(invalid("price", "price must be positive"));
        }
        if self.stop_price.is_some_and(|p| p <= Decimal::ZERO) {
            return Err(invalid("stop_price", "stop price must be positive"));
        }
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> OrderError {
    OrderError::InvalidParameters {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Order Aggregate Root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    symbol: Symbol,
    side: OrderSide,
    order_type: OrderType,
    amount: Decimal,
    price: Option<Decimal>,
    stop_price: Option<Decimal>,
    status: OrderStatus,
    filled: Decimal,
    average_price: Option<Decimal>,
    venue: Option<String>,
    venue_order_id: Option<VenueOrderId>,
    metadata: Metadata,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Create a new `PENDING` order.
    pub fn new(request: OrderRequest) -> Result<Self, OrderError> {
        request.validate()?;
        let now = Utc::now();

        Ok(Self {
            id: OrderId::generate(),
            symbol: request.symbol,
            side: request.side,
            order_type: request.order_type,
            amount: request.amount,
            price: request.price,
            stop_price: request.stop_price,
            status: OrderStatus::Pending,
            filled: Decimal::ZERO,
            average_price: None,
            venue: None,
            venue_order_id: None,
            metadata: request.metadata,
            created_at: now,
            updated_at: now,
        })
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// Order identifier.
    #[must_use]
    pub const fn id(&self) -> &OrderId {
        &self.id
    }

    /// Traded symbol.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Order side.
    #[must_use]
    pub const fn side(&self) -> OrderSide {
        self.side
    }

    /// Order type.
    #[must_use]
    pub const fn order_type(&self) -> OrderType {
        self.order_type
    }

    /// Requested quantity.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// Limit price.
    #[must_use]
    pub const fn price(&self) -> Option<Decimal> {
        self.price
    }

    /// Stop trigger price.
    #[must_use]
    pub const fn stop_price(&self) -> Option<Decimal> {
        self.stop_price
    }

    /// Lifecycle status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Filled quantity.
    #[must_use]
    pub const fn filled(&self) -> Decimal {
        self.filled
    }

    /// Quantity still open.
    #[must_use]
    pub fn remaining(&self) -> Decimal {
        self.amount - self.filled
    }

    /// Volume-weighted average fill price.
    #[must_use]
    pub const fn average_price(&self) -> Option<Decimal> {
        self.average_price
    }

    /// Venue the order was routed to.
    #[must_use]
    pub fn venue(&self) -> Option<&str> {
        self.venue.as_deref()
    }

    /// Identifier assigned by the venue.
    #[must_use]
    pub const fn venue_order_id(&self) -> Option<&VenueOrderId> {
        self.venue_order_id.as_ref()
    }

    /// Metadata map.
    #[must_use]
    pub const fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Metadata entry by key.
    #[must_use]
    pub fn meta(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    /// Creation time.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last update time.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Attach or overwrite a metadata entry.
    pub fn set_meta(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        self.metadata.insert(key.to_string(), value.into());
        self.touch();
    }

    /// Record which venue the order is routed to.
    pub fn assign_venue(&mut self, venue: impl Into<String>) {
        self.venue = Some(venue.into());
        self.touch();
    }

    // ========================================================================
    // State Transitions
    // ========================================================================

    /// Mark the order as accepted by a venue.
    pub fn accept(&mut self, venue_order_id: Option<VenueOrderId>) -> Result<(), OrderError> {
        if self.status != OrderStatus::Pending {
            return Err(self.transition_error(OrderStatus::Open));
        }
        if venue_order_id.is_some() {
            self.venue_order_id = venue_order_id;
        }
        self.status = OrderStatus::Open;
        self.touch();
        Ok(())
    }

    /// Apply a fill, updating the average price incrementally.
    ///
    /// `avg' = (avg * filled + price * qty) / (filled + qty)`
    pub fn apply_fill(&mut self, quantity: Decimal, price: Decimal) -> Result<(), OrderError> {
        if !self.status.can_fill() {
            return Err(self.transition_error(OrderStatus::Filled));
        }
        if quantity <= Decimal::ZERO {
            return Err(invalid("fill_quantity", "fill quantity must be positive"));
        }
        if price <= Decimal::ZERO {
            return Err(invalid("fill_price", "fill price must be positive"));
        }
        let remaining = self.remaining();
        if quantity > remaining {
            return Err(OrderError::FillExceedsRemaining {
                fill_qty: quantity,
                remaining,
            });
        }

        let prev_avg = self.average_price.unwrap_or(Decimal::ZERO);
        let new_filled = self.filled + quantity;
        self.average_price = Some((prev_avg * self.filled + price * quantity) / new_filled);
        self.filled = new_filled;
        self.status = if self.remaining().is_zero() {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        self.touch();
        Ok(())
    }

    /// Cancel the order.
    pub fn cancel(&mut self) -> Result<(), OrderError> {
        self.terminate(OrderStatus::Canceled)
    }

    /// Mark the order rejected, recording the reason.
    pub fn reject(&mut self, reason: &str) -> Result<(), OrderError> {
        self.terminate(OrderStatus::Rejected)?;
        self.metadata
            .insert("reject_reason".to_string(), reason.into());
        Ok(())
    }

    /// Mark the order expired.
    pub fn expire(&mut self) -> Result<(), OrderError> {
        self.terminate(OrderStatus::Expired)
    }

    /// Apply a status report from a venue.
    ///
    /// Venue reports may carry cumulative fill figures that replace local
    /// ones. The status must follow the lifecycle forward, cumulative fills
    /// never shrink, and a FILLED report without figures fills the whole
    /// amount.
    pub fn apply_report(
        &mut self,
        status: OrderStatus,
        filled: Option<Decimal>,
        average_price: Option<Decimal>,
        venue_order_id: Option<VenueOrderId>,
    ) -> Result<(), OrderError> {
        if !self.status.can_transition_to(status) {
            return Err(self.transition_error(status));
        }
        let filled = match (status, filled) {
            (OrderStatus::Filled, None) => Some(self.amount),
            (_, filled) => filled,
        };
        if let Some(filled) = filled {
            if filled < self.filled || filled > self.amount {
                return Err(OrderError::FillExceedsRemaining {
                    fill_qty: filled,
                    remaining: self.amount,
                });
            }
            if status == OrderStatus::Filled && filled != self.amount {
                return Err(OrderError::InvalidParameters {
                    field: "filled".to_string(),
                    message: format!("FILLED report with {filled} of {}", self.amount),
                });
            }
            self.filled = filled;
        }
        if average_price.is_some() {
            self.average_price = average_price;
        }
        if venue_order_id.is_some() {
            self.venue_order_id = venue_order_id;
        }
        self.status = status;
        self.touch();
        Ok(())
    }

    fn terminate(&mut self, to: OrderStatus) -> Result<(), OrderError> {
        if self.status.is_terminal() {
            return Err(self.transition_error(to));
        }
        self.status = to;
        self.touch();
        Ok(())
    }

    const fn transition_error(&self, to: OrderStatus) -> OrderError {
        OrderError::InvalidStateTransition {
            from: self.status,
            to,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn market_buy(amount: Decimal) -> Order {
        Order::new(OrderRequest::market("BTC/USDT", OrderSide::Buy, amount)).unwrap()
    }

    #[test]
    fn new_order_is_pending_with_full_remaining() {
        let order = market_buy(dec!(2));
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.remaining(), dec!(2));
        assert!(order.id().as_str().starts_with("ord-"));
    }

    #[test]
    fn limit_without_price_rejected() {
        let request =
            OrderRequest::market("BTC/USDT", OrderSide::Buy, dec!(1)).with_type(OrderType::Limit);
        let err = Order::new(request).unwrap_err();
        assert!(matches!(err, OrderError::InvalidParameters { ref field, .. } if field == "price"));
    }

    #[test]
    fn zero_amount_rejected() {
        assert!(Order::new(OrderRequest::market("ETH/USDT", OrderSide::Sell, dec!(0))).is_err());
    }

    #[test]
    fn fills_update_weighted_average() {
        let mut order = market_buy(dec!(3));
        order.accept(Some(VenueOrderId::new("x-1"))).unwrap();
        order.apply_fill(dec!(1), dec!(100)).unwrap();
        assert_eq!(order.status(), OrderStatus::PartiallyFilled);
        order.apply_fill(dec!(2), dec!(130)).unwrap();
        assert_eq!(order.status(), OrderStatus::Filled);
        assert_eq!(order.average_price(), Some(dec!(120)));
        assert_eq!(order.remaining(), Decimal::ZERO);
    }

    #[test]
    fn overfill_rejected() {
        let mut order = market_buy(dec!(1));
        let err = order.apply_fill(dec!(2), dec!(10)).unwrap_err();
        assert!(matches!(err, OrderError::FillExceedsRemaining { .. }));
        assert_eq!(order.filled(), Decimal::ZERO);
    }

    #[test]
    fn terminal_order_cannot_be_canceled() {
        let mut order = market_buy(dec!(1));
        order.apply_fill(dec!(1), dec!(10)).unwrap();
        assert!(order.cancel().is_err());
    }

    #[test]
    fn reject_records_reason() {
        let mut order = market_buy(dec!(1));
        order.reject("insufficient balance").unwrap();
        assert_eq!(order.status(), OrderStatus::Rejected);
        assert_eq!(
            order.meta("reject_reason"),
            Some(&serde_json::Value::from("insufficient balance"))
        );
    }

    #[test]
    fn venue_report_replaces_fill_figures() {
        let mut order = market_buy(dec!(4));
        order
            .apply_report(
                OrderStatus::PartiallyFilled,
                Some(dec!(1.5)),
                Some(dec!(99)),
                Some(VenueOrderId::new("v-9")),
            )
            .unwrap();
        assert_eq!(order.remaining(), dec!(2.5));
        assert_eq!(order.venue_order_id().map(|v| v.as_str()), Some("v-9"));
    }

    #[test]
    fn report_cannot_move_order_backwards() {
        let mut order = market_buy(dec!(2));
        order.accept(Some(VenueOrderId::new("v-1"))).unwrap();
        let err = order
            .apply_report(OrderStatus::Pending, None, None, None)
            .unwrap_err();
        assert_eq!(
            err,
            OrderError::InvalidStateTransition {
                from: OrderStatus::Open,
                to: OrderStatus::Pending,
            }
        );
        assert_eq!(order.status(), OrderStatus::Open);
    }

    #[test]
    fn filled_report_without_figures_fills_everything() {
        let mut order = market_buy(dec!(2));
        order.accept(None).unwrap();
        order
            .apply_report(OrderStatus::Filled, None, Some(dec!(101)), None)
            .unwrap();
        assert_eq!(order.filled(), dec!(2));
        assert_eq!(order.remaining(), Decimal::ZERO);
    }

    #[test]
    fn filled_report_with_short_quantity_rejected() {
        let mut order = market_buy(dec!(2));
        let err = order
            .apply_report(OrderStatus::Filled, Some(dec!(1)), None, None)
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidParameters { ref field, .. } if field == "filled"));
        assert_eq!(order.status(), OrderStatus::Pending);
    }

    #[test]
    fn cumulative_fill_cannot_shrink() {
        let mut order = market_buy(dec!(4));
        order
            .apply_report(OrderStatus::PartiallyFilled, Some(dec!(2)), None, None)
            .unwrap();
        let err = order
            .apply_report(OrderStatus::PartiallyFilled, Some(dec!(1)), None, None)
            .unwrap_err();
        assert!(matches!(err, OrderError::FillExceedsRemaining { .. }));
        assert_eq!(order.filled(), dec!(2));
    }

    #[test]
    fn order_serde_roundtrip() {
        let order = market_buy(dec!(1.25));
        let json = serde_json::to_string(&order).unwrap();
        let parsed: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(order, parsed);
    }
}
