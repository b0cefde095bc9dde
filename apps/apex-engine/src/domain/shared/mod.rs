//! Shared Domain Types
//!
//! Value objects shared across bounded contexts.

mod candle;
mod identifiers;
mod symbol;

pub use candle::Candle;
pub use identifiers::{AdvancedOrderId, ExecutionId, OrderId, PositionId, VenueOrderId};
pub use symbol::Symbol;

/// Free-form annotations attached to orders, positions and signals.
///
/// Used to tag parentage (`twap_slice`, `bracket_parent`, ...) and exit details.
pub type Metadata = std::collections::BTreeMap<String, serde_json::Value>;
