//! Advanced Orders Bounded Context
//!
//! Iceberg, trailing-stop and bracket state machines. Each one decides what
//! to send next; none of them talks to a venue.

mod bracket;
mod errors;
mod iceberg;
mod trailing_stop;

pub use bracket::{BracketLeg, BracketOrder, BracketParams, BracketState, BracketStatus};
pub use errors::AdvancedOrderError;
pub use iceberg::{IcebergOrder, IcebergParams, IcebergState, IcebergStatus};
pub use trailing_stop::{
    TrailSpec, TrailingState, TrailingStop, TrailingStopParams, TrailingStopStatus,
};

use serde::{Deserialize, Serialize};

use crate::domain::shared::{AdvancedOrderId, Symbol};

/// Any advanced order held by the manager.
#[derive(Debug, Clone)]
pub enum AdvancedOrder {
    /// Iceberg.
    Iceberg(IcebergOrder),
    /// Trailing stop.
    TrailingStop(TrailingStop),
    /// Bracket.
    Bracket(BracketOrder),
}

impl AdvancedOrder {
    /// Identifier.
    #[must_use]
    pub const fn id(&self) -> &AdvancedOrderId {
        match self {
            Self::Iceberg(o) => o.id(),
            Self::TrailingStop(o) => o.id(),
            Self::Bracket(o) => o.id(),
        }
    }

    /// Traded symbol.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        match self {
            Self::Iceberg(o) => &o.params().symbol,
            Self::TrailingStop(o) => o.symbol(),
            Self::Bracket(o) => &o.params().symbol,
        }
    }

    /// Kind label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Iceberg(_) => "iceberg",
            Self::TrailingStop(_) => "trailing_stop",
            Self::Bracket(_) => "bracket",
        }
    }

    /// True while the order can still produce or release child orders.
    #[must_use]
    pub fn is_active(&self) -> bool {
        match self {
            Self::Iceberg(o) => o.state() == IcebergState::Active,
            Self::TrailingStop(o) => o.is_active(),
            Self::Bracket(o) => !o.state().is_terminal(),
        }
    }

    /// Current state label.
    #[must_use]
    pub fn state_label(&self) -> String {
        match self {
            Self::Iceberg(o) => o.state().to_string(),
            Self::TrailingStop(o) => o.state().to_string(),
            Self::Bracket(o) => o.state().to_string(),
        }
    }

    /// Cooperative cancel; child orders already placed are untouched.
    pub fn cancel(&mut self) -> Result<(), AdvancedOrderError> {
        match self {
            Self::Iceberg(o) => o.cancel(),
            Self::TrailingStop(o) => o.cancel(),
            Self::Bracket(o) => o.cancel(),
        }
    }

    /// Status snapshot.
    #[must_use]
    pub fn status(&self) -> AdvancedOrderStatus {
        let detail = match self {
            Self::Iceberg(o) => AdvancedOrderDetail::Iceberg(o.status()),
            Self::TrailingStop(o) => AdvancedOrderDetail::TrailingStop(o.status()),
            Self::Bracket(o) => AdvancedOrderDetail::Bracket(o.status()),
        };
        AdvancedOrderStatus {
            id: self.id().clone(),
            symbol: self.symbol().clone(),
            detail,
        }
    }
}

/// Status of one advanced order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancedOrderStatus {
    /// Identifier.
    pub id: AdvancedOrderId,
    /// Traded symbol.
    pub symbol: Symbol,
    /// Kind-specific state.
    pub detail: AdvancedOrderDetail,
}

/// Kind-specific status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdvancedOrderDetail {
    /// Iceberg status.
    Iceberg(IcebergStatus),
    /// Trailing stop status.
    TrailingStop(TrailingStopStatus),
    /// Bracket status.
    Bracket(BracketStatus),
}
