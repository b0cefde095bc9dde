//! Application Services
//!
//! Registries and coordinators over the domain state machines. Each
//! service owns one registry behind a single lock; ports are injected as
//! `Arc<dyn Trait>`.

mod advanced_order_manager;
mod execution_engine;
mod market_monitor;
mod order_manager;
mod position_tracker;
mod risk_service;
mod smart_router;

pub use advanced_order_manager::{AdvancedOrderManager, FINISHED_ORDER_HISTORY};
pub use execution_engine::{Execution, ExecutionEngine, ExecutionStatus};
pub use market_monitor::{DEFAULT_TICK_INTERVAL, MarketMonitor, TickReport};
pub use order_manager::{OrderLedgerSnapshot, OrderManager, OrderStatistics};
pub use position_tracker::{
    ExitSignal, PnlSummary, PositionBookSnapshot, PositionStatistics, PositionTracker,
};
pub use risk_service::RiskService;
pub use smart_router::{RoutedOrder, RouterSettings, SmartRouter, VenueStatus};
