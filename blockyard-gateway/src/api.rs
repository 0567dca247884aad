//! Coordinator REST API
//!
//! - `POST /sendFile` multipart upload (field `file`)
//! - `GET /retrieveFile?fileName=` raw download
//! - `GET /nodesUsage` usage per node, ascending
//! - `POST /addNode` register a storage node (`{"Url": ...}`)

use axum::{
    extract::{
        multipart::MultipartError, rejection::JsonRejection, DefaultBodyLimit, Multipart, Query,
        State,
    },
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use blockyard_core::BlockyardError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::{AppState, UploadSummary};

/// Query parameters for file retrieval
#[derive(Debug, Deserialize)]
pub struct RetrieveQuery {
    #[serde(rename = "fileName")]
    pub file_name: Option<String>,
}

/// Node registration request
#[derive(Debug, Deserialize, Serialize)]
pub struct AddNodeRequest {
    #[serde(rename = "Url")]
    pub url: String,
}

/// Node registration response
#[derive(Debug, Serialize)]
pub struct AddNodeResponse {
    #[serde(rename = "Url")]
    pub url: String,
    pub nodes: usize,
}

pub fn routes(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/sendFile",
            post(send_file).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/retrieveFile", get(retrieve_file))
        .route("/nodesUsage", get(nodes_usage))
        .route("/addNode", post(add_node))
}

pub async fn health() -> &'static str {
    "OK"
}

/// Record request metrics and render the result
fn observe<T: IntoResponse>(route: &'static str, started: Instant, result: ApiResult<T>) -> Response {
    let response = result.into_response();
    metrics::record_request(route, response.status().as_u16());
    metrics::record_latency(route, started.elapsed().as_secs_f64());
    response
}

fn bad_multipart(e: MultipartError) -> ApiError {
    ApiError(BlockyardError::Validation(format!("malformed multipart body: {}", e)))
}

// =========================================================================
// UPLOAD
// =========================================================================

async fn send_file(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let started = Instant::now();
    observe("sendFile", started, handle_send_file(&state, multipart).await)
}

async fn handle_send_file(state: &AppState, multipart: Multipart) -> ApiResult<Json<UploadSummary>> {
    let (file_name, data) = read_file_field(multipart).await?;
    debug!(file = %file_name, bytes = data.len(), "Upload received");
    let summary = state.upload(&file_name, data).await?;
    Ok(Json(summary))
}

/// Pull the `file` field out of a multipart body
async fn read_file_field(mut multipart: Multipart) -> ApiResult<(String, Bytes)> {
    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                ApiError(BlockyardError::Validation(
                    "multipart field 'file' has no file name".into(),
                ))
            })?;
        let data = field.bytes().await.map_err(bad_multipart)?;
        return Ok((file_name, data));
    }

    Err(ApiError(BlockyardError::Validation(
        "multipart field 'file' is missing".into(),
    )))
}

// =========================================================================
// DOWNLOAD
// =========================================================================

async fn retrieve_file(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RetrieveQuery>,
) -> Response {
    let started = Instant::now();
    observe("retrieveFile", started, handle_retrieve_file(&state, query).await)
}

async fn handle_retrieve_file(state: &AppState, query: RetrieveQuery) -> ApiResult<Response> {
    let file_name = query
        .file_name
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            ApiError(BlockyardError::Validation(
                "missing fileName query parameter".into(),
            ))
        })?;

    let data = state.download(&file_name).await?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], data).into_response())
}

// =========================================================================
// NODES
// =========================================================================

async fn nodes_usage(State(state): State<Arc<AppState>>) -> Response {
    let started = Instant::now();
    observe("nodesUsage", started, handle_nodes_usage(&state).await)
}

async fn handle_nodes_usage(state: &AppState) -> ApiResult<Json<Vec<BTreeMap<String, u64>>>> {
    let nodes = state.registry().refresh_usage().await?;
    let body = nodes
        .into_iter()
        .map(|node| BTreeMap::from([(node.address, node.usage)]))
        .collect();
    Ok(Json(body))
}

async fn add_node(
    State(state): State<Arc<AppState>>,
    request: Result<Json<AddNodeRequest>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    observe("addNode", started, handle_add_node(&state, request).await)
}

async fn handle_add_node(
    state: &AppState,
    request: Result<Json<AddNodeRequest>, JsonRejection>,
) -> ApiResult<Json<AddNodeResponse>> {
    let Json(request) = request.map_err(|e| {
        ApiError(BlockyardError::Validation(format!("invalid addNode body: {}", e)))
    })?;

    let url = state.registry().register_node(&request.url).await?;
    let nodes = state.registry().addresses().len();
    info!(node = %url, nodes, "Node added");

    Ok(Json(AddNodeResponse { url, nodes }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_node_request_shape() {
        let request: AddNodeRequest =
            serde_json::from_str(r#"{"Url": "http://10.0.0.7:8081"}"#).unwrap();
        assert_eq!(request.url, "http://10.0.0.7:8081");
    }

    #[test]
    fn test_retrieve_query_optional() {
        let query: RetrieveQuery = serde_json::from_str("{}").unwrap();
        assert!(query.file_name.is_none());
    }

    #[test]
    fn test_observe_passes_status_through() {
        let ok = observe("test", Instant::now(), Ok::<_, ApiError>("fine"));
        assert_eq!(ok.status().as_u16(), 200);

        let err = observe::<&str>(
            "test",
            Instant::now(),
            Err(ApiError(BlockyardError::Unavailable("none".into()))),
        );
        assert_eq!(err.status().as_u16(), 503);
    }
}
