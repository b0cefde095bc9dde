//! Execution Tactic Services

mod child_order;
mod pov_executor;
mod slice_schedule;
mod twap_executor;
mod volume_profile;
mod vwap_executor;

pub use pov_executor::PovExecutor;
pub use twap_executor::TwapExecutor;
pub use volume_profile::u_shaped_profile;
pub use vwap_executor::VwapExecutor;
