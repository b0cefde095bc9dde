// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::cast_possible_wrap,
        clippy::option_if_let_else,
        clippy::items_after_statements
    )
)]

//! Apex Engine - Execution and Routing Core
//!
//! Routes orders across venues, slices parent orders over time, drives
//! iceberg, trailing-stop and bracket orders, gates new positions on risk
//! limits and replays history through strategies.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: deterministic business logic
//!   - `order_execution`: Order aggregate and status lifecycle
//!   - `position_tracking`: Position aggregate and exit triggers
//!   - `risk_management`: sizing, stop/target levels and loss gates
//!   - `routing`: venue scoring, routing decisions, arbitrage
//!   - `execution_tactics`: TWAP, VWAP and POV slicers
//!   - `advanced_orders`: iceberg, trailing stop and bracket state machines
//!
//! - **Application**: ports (`VenuePort`, `AlertSink`, `Clock`) and the
//!   services that own shared registries (`SmartRouter`, `ExecutionEngine`,
//!   `AdvancedOrderManager`, `OrderManager`, `PositionTracker`,
//!   `RiskService`, `MarketMonitor`)
//!
//! - **Infrastructure**: paper venue, alert sinks, clocks and JSON
//!   snapshot persistence
//!
//! Alongside the layers: `backtest` (bar replay and metrics), `config`
//! (YAML with environment interpolation), `observability` (metrics facade)
//! and `telemetry` (tracing subscriber).

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Services and port definitions.
pub mod application;

/// Infrastructure layer - Adapters for the application ports.
pub mod infrastructure;

// =============================================================================
// Supporting Modules
// =============================================================================

/// Historical bar replay and performance metrics.
pub mod backtest;

/// Configuration loading and validation.
pub mod config;

/// Metrics recording.
pub mod observability;

/// Tracing subscriber setup.
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

// Domain re-exports
pub use domain::order_execution::{Order, OrderRequest, OrderSide, OrderStatus, OrderType};
pub use domain::position_tracking::{ExitReason, Position, PositionSide};
pub use domain::risk_management::{RiskConfig, RiskLevel, RiskManager};
pub use domain::routing::{RoutingDecision, RoutingPriority};
pub use domain::shared::{Candle, ExecutionId, OrderId, Symbol};

// Application re-exports
pub use application::ports::{Alert, AlertSink, Clock, VenuePort};
pub use application::services::{
    AdvancedOrderManager, ExecutionEngine, MarketMonitor, OrderManager, PositionTracker,
    RiskService, SmartRouter,
};

// Infrastructure re-exports
pub use infrastructure::{
    InMemoryAlertSink, JsonSnapshotStore, LogAlertSink, ManualClock, PaperVenue, SystemClock,
};

// Supporting re-exports
pub use backtest::{BacktestConfig, BacktestEngine, BacktestResult};
pub use config::{Config, ConfigError, load_config};
