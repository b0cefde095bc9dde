//! Observability module for metrics.
//!
//! Metrics go through the `metrics` facade; installing an exporter is left
//! to the embedding binary. Without one every call is a no-op.

mod metrics;

pub use self::metrics::{
    record_execution_finished, record_failover, record_risk_rejection, record_route,
    record_routing_failure, record_slice_emitted, record_trailing_stop_triggered,
    record_venue_fetch_failure, update_active_executions, update_venue_reliability,
};
