//! Execution Tactics Value Objects

mod algo_status;
mod params;
mod performance;
mod slices;

pub use algo_status::{AlgoKind, AlgoStatus};
pub use params::{PovParams, TwapParams, VwapParams};
pub use performance::AlgoPerformance;
pub use slices::PlannedSlice;
