//! Order aggregate.

mod order;

pub use order::{Order, OrderRequest};
