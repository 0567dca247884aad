//! Prometheus metrics for the Blockyard storage node
//!
//! Exposes storage usage, block traffic and registration outcomes on the
//! node's own HTTP port.

use axum::{routing::get, Router};
use blockyard_storage::StoreStats;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Duration;

/// Metric names as constants
pub mod names {
    // Storage metrics
    pub const STORAGE_BYTES_USED: &str = "blockyard_node_storage_bytes_used";
    pub const STORAGE_BYTES_AVAILABLE: &str = "blockyard_node_storage_bytes_available";
    pub const STORAGE_BLOCKS_TOTAL: &str = "blockyard_node_storage_blocks_total";

    // Request metrics
    pub const REQUESTS_TOTAL: &str = "blockyard_node_requests_total";
    pub const REQUESTS_DURATION: &str = "blockyard_node_request_duration_seconds";
    pub const BYTES_STORED: &str = "blockyard_node_bytes_stored_total";
    pub const BYTES_SERVED: &str = "blockyard_node_bytes_served_total";
    pub const REJECTED_TOTAL: &str = "blockyard_node_rejected_total";

    // Registration metrics
    pub const REGISTRATION_ATTEMPTS: &str = "blockyard_node_registration_attempts_total";
}

/// Install the Prometheus recorder and describe node metrics
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_gauge!(
        names::STORAGE_BYTES_USED,
        "Total bytes currently stored on this node"
    );
    describe_gauge!(
        names::STORAGE_BYTES_AVAILABLE,
        "Remaining capacity in bytes"
    );
    describe_gauge!(names::STORAGE_BLOCKS_TOTAL, "Number of blocks stored");
    describe_counter!(names::REQUESTS_TOTAL, "Block requests processed");
    describe_histogram!(
        names::REQUESTS_DURATION,
        "Block request processing duration in seconds"
    );
    describe_counter!(names::BYTES_STORED, "Bytes written by /receiveFile");
    describe_counter!(names::BYTES_SERVED, "Bytes returned by /retrieveFile");
    describe_counter!(names::REJECTED_TOTAL, "Block writes refused, by reason");
    describe_counter!(
        names::REGISTRATION_ATTEMPTS,
        "Coordinator registration attempts, by outcome"
    );

    Ok(handle)
}

/// `/metrics` route that can be merged into any router
pub fn routes<S: Clone + Send + Sync + 'static>(handle: PrometheusHandle) -> Router<S> {
    let handle = Arc::new(handle);
    Router::new().route(
        "/metrics",
        get(move || {
            let h = handle.clone();
            async move { h.render() }
        }),
    )
}

/// Metrics recorder labelled with the node's name
#[derive(Clone, Debug)]
pub struct NodeMetrics {
    node: String,
}

impl NodeMetrics {
    pub fn new(node: impl Into<String>) -> Self {
        Self { node: node.into() }
    }

    /// Record a stored block
    pub fn record_store(&self, size: usize, duration: Duration) {
        counter!(names::REQUESTS_TOTAL, "node" => self.node.clone(), "operation" => "store")
            .increment(1);
        histogram!(names::REQUESTS_DURATION, "node" => self.node.clone(), "operation" => "store")
            .record(duration.as_secs_f64());
        counter!(names::BYTES_STORED, "node" => self.node.clone()).increment(size as u64);
    }

    /// Record a served block
    pub fn record_get(&self, size: usize, duration: Duration) {
        counter!(names::REQUESTS_TOTAL, "node" => self.node.clone(), "operation" => "get")
            .increment(1);
        histogram!(names::REQUESTS_DURATION, "node" => self.node.clone(), "operation" => "get")
            .record(duration.as_secs_f64());
        counter!(names::BYTES_SERVED, "node" => self.node.clone()).increment(size as u64);
    }

    /// Record a refused write
    pub fn record_rejected(&self, reason: &'static str) {
        counter!(names::REJECTED_TOTAL, "node" => self.node.clone(), "reason" => reason)
            .increment(1);
    }

    /// Update storage gauges
    pub fn update_storage(&self, stats: &StoreStats) {
        gauge!(names::STORAGE_BYTES_USED, "node" => self.node.clone()).set(stats.bytes_used as f64);
        if stats.bytes_capacity > 0 {
            gauge!(names::STORAGE_BYTES_AVAILABLE, "node" => self.node.clone())
                .set(stats.bytes_available() as f64);
        }
        gauge!(names::STORAGE_BLOCKS_TOTAL, "node" => self.node.clone())
            .set(stats.block_count as f64);
    }

    /// Record a registration attempt
    pub fn record_registration(&self, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        counter!(names::REGISTRATION_ATTEMPTS, "node" => self.node.clone(), "outcome" => outcome)
            .increment(1);
    }
}
