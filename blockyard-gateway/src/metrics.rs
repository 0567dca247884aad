//! Prometheus Metrics for the Blockyard coordinator
//!
//! Exposes metrics at GET /metrics in Prometheus text format.
//! Uses the `metrics` crate with prometheus exporter.

use axum::{routing::get, Router};
use blockyard_core::{BlockyardError, Result};
use metrics::{counter, gauge, histogram};
use std::sync::Arc;

/// Initialize the Prometheus metrics exporter and install it as the global recorder.
/// Returns the handle for rendering metrics on the /metrics endpoint.
pub fn init_metrics() -> Result<metrics_exporter_prometheus::PrometheusHandle> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| BlockyardError::Internal(format!("failed to install metrics recorder: {}", e)))
}

/// Create metrics route that can be merged into any Router
pub fn routes<S: Clone + Send + Sync + 'static>(
    handle: metrics_exporter_prometheus::PrometheusHandle,
) -> Router<S> {
    let handle = Arc::new(handle);
    Router::new().route(
        "/metrics",
        get(move || {
            let h = handle.clone();
            async move { h.render() }
        }),
    )
}

// ============================================================================
// Metric Recording Helpers
// ============================================================================

/// Record an API request
pub fn record_request(route: &'static str, status: u16) {
    counter!("blockyard_requests_total", "route" => route, "status" => status.to_string())
        .increment(1);
}

/// Record API request latency
pub fn record_latency(route: &'static str, duration_secs: f64) {
    histogram!("blockyard_request_duration_seconds", "route" => route).record(duration_secs);
}

/// Record bytes uploaded
pub fn record_bytes_uploaded(bytes: u64) {
    counter!("blockyard_bytes_uploaded_total").increment(bytes);
}

/// Record bytes downloaded
pub fn record_bytes_downloaded(bytes: u64) {
    counter!("blockyard_bytes_downloaded_total").increment(bytes);
}

/// Record registered node count
pub fn set_registered_nodes(count: u64) {
    gauge!("blockyard_registered_nodes").set(count as f64);
}

/// Record a node eviction after a failed transfer
pub fn record_node_eviction() {
    counter!("blockyard_node_evictions_total").increment(1);
}

/// Record a failed block transfer attempt
pub fn record_block_transfer_failure(kind: &'static str) {
    counter!("blockyard_block_transfer_failures_total", "kind" => kind).increment(1);
}
