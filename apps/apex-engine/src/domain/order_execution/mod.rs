//! Order Execution Bounded Context
//!
//! One concrete [`Order`](aggregate::Order) type whose status enum drives
//! every lifecycle transition. Venue-specific behaviour lives behind the
//! venue port, never in order subtypes.

pub mod aggregate;
pub mod errors;
pub mod value_objects;

pub use aggregate::{Order, OrderRequest};
pub use errors::OrderError;
pub use value_objects::{OrderSide, OrderStatus, OrderType};
