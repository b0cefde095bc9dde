//! Metrics for routing, execution algorithms and risk gates.

use metrics::{counter, gauge, histogram};

// ============================================================================
// Routing Metrics
// ============================================================================

/// Record an order placed through the router.
///
/// # Arguments
///
/// * `venue` - Venue that accepted the order
/// * `priority` - Routing priority (e.g., "price", "fees")
/// * `failover` - Whether the order landed on a fallback venue
/// * `latency_seconds` - Time spent in the placement call
pub fn record_route(venue: &str, priority: &str, failover: bool, latency_seconds: f64) {
    counter!(
        "routed_orders_total",
        "venue" => venue.to_string(),
        "priority" => priority.to_string(),
        "failover" => failover.to_string()
    )
    .increment(1);

    histogram!(
        "venue_placement_latency_seconds",
        "venue" => venue.to_string()
    )
    .record(latency_seconds);
}

/// Record a failover from one venue to the next.
pub fn record_failover(from: &str, to: &str) {
    counter!(
        "routing_failovers_total",
        "from" => from.to_string(),
        "to" => to.to_string()
    )
    .increment(1);
}

/// Record a routing pass that produced no placement.
///
/// # Arguments
///
/// * `symbol` - Symbol being routed
/// * `reason` - `"no_venues"` or `"all_failed"`
pub fn record_routing_failure(symbol: &str, reason: &str) {
    counter!(
        "routing_failures_total",
        "symbol" => symbol.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record a failed market-data fetch from a venue.
pub fn record_venue_fetch_failure(venue: &str) {
    counter!(
        "venue_fetch_failures_total",
        "venue" => venue.to_string()
    )
    .increment(1);
}

/// Update the reliability gauge of a venue.
pub fn update_venue_reliability(venue: &str, reliability: f64) {
    gauge!(
        "venue_reliability",
        "venue" => venue.to_string()
    )
    .set(reliability);
}

// ============================================================================
// Execution Metrics
// ============================================================================

/// Record a child order emitted by an execution algorithm.
pub fn record_slice_emitted(algorithm: &str) {
    counter!(
        "algo_slices_total",
        "algorithm" => algorithm.to_string()
    )
    .increment(1);
}

/// Record an execution reaching a terminal status.
///
/// # Arguments
///
/// * `algorithm` - "twap", "vwap" or "pov"
/// * `status` - Terminal status label
/// * `slippage_bps` - Slippage against the target price in basis points
pub fn record_execution_finished(algorithm: &str, status: &str, slippage_bps: f64) {
    counter!(
        "algo_executions_finished_total",
        "algorithm" => algorithm.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        "algo_slippage_bps",
        "algorithm" => algorithm.to_string()
    )
    .record(slippage_bps);
}

/// Update the number of registered, non-terminal executions.
pub fn update_active_executions(count: usize) {
    gauge!("algo_executions_active").set(count as f64);
}

/// Record a trailing stop firing.
pub fn record_trailing_stop_triggered(symbol: &str) {
    counter!(
        "trailing_stops_triggered_total",
        "symbol" => symbol.to_string()
    )
    .increment(1);
}

// ============================================================================
// Risk Metrics
// ============================================================================

/// Record a refused position open.
///
/// # Arguments
///
/// * `reason` - Gate that refused (e.g., "daily loss limit reached")
pub fn record_risk_rejection(reason: &str) {
    counter!(
        "risk_gate_rejections_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_exporter_is_noop() {
        record_route("paper", "price", false, 0.002);
        record_failover("alpha", "beta");
        record_routing_failure("BTC/USDT", "all_failed");
        record_slice_emitted("twap");
        record_execution_finished("twap", "COMPLETED", 1.5);
        record_risk_rejection("max total risk reached");
        update_active_executions(3);
    }
}
