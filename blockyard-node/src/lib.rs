//! Blockyard Storage Node Library
//!
//! Provides components for running a block storage node:
//! - Configuration management
//! - HTTP block API served to the coordinator
//! - Coordinator registration
//! - Prometheus metrics

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod registration;

pub use api::{NodeSpace, NodeState};
pub use config::{
    ConfigError, CoordinatorSettings, MetricsSettings, NetworkSettings, NodeConfig, NodeIdentity,
    StorageSettings,
};
pub use error::{NodeError, NodeResult};
pub use metrics::{init_metrics, NodeMetrics};
pub use registration::{Registrar, RegistrationError};

use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the node's HTTP router
pub fn router(state: Arc<NodeState>, metrics_handle: Option<PrometheusHandle>) -> Router {
    let mut app = Router::new()
        .route("/health", get(api::health))
        .merge(api::routes(state.max_block_bytes()));

    if let Some(handle) = metrics_handle {
        app = app.merge(metrics::routes(handle));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}
