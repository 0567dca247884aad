//! Blockyard coordinator library
//!
//! Splits uploaded files into blocks, places each block on the least-loaded
//! storage node, and reassembles files on download. Re-exports the pieces
//! needed by the binary and by integration tests.

pub mod api;
pub mod assembler;
pub mod error;
pub mod metrics;
pub mod node_client;
pub mod node_monitor;
pub mod registry;
pub mod state;
pub mod transfer;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ApiError, ApiResult};
pub use node_client::{HttpNodeClient, NodeClientConfig, NodeTransport};
pub use registry::{Node, NodeRegistry, PlacementPolicy};
pub use state::{AppState, GatewayConfig, UploadSummary};

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use blockyard_core::{BlockyardError, Result};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the coordinator's HTTP router
pub fn router(state: Arc<AppState>, metrics_handle: Option<PrometheusHandle>) -> Router {
    let mut app = Router::new()
        .route("/health", get(api::health))
        .merge(api::routes(state.config().max_upload_bytes));

    if let Some(handle) = metrics_handle {
        app = app.merge(metrics::routes(handle));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Build the CORS layer
///
/// Permissive mode allows any origin. Otherwise only `origins` may make
/// cross-origin calls, limited to the methods and headers the API uses.
pub fn cors_layer(permissive: bool, origins: &[String]) -> Result<CorsLayer> {
    if permissive {
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any));
    }

    let allowed = origins
        .iter()
        .map(|origin| {
            origin.parse::<HeaderValue>().map_err(|e| {
                BlockyardError::Validation(format!("invalid CORS origin {:?}: {}", origin, e))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]))
}
