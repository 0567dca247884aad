//! Storage node HTTP surface
//!
//! - `POST /receiveFile` multipart block upload (field `file`)
//! - `GET /retrieveFile?filename=` raw block bytes
//! - `GET /checkIfFileExists?filename=`
//! - `GET /getCurrentNodeSpace` bytes used, as `{"Size": n}`

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use blockyard_storage::{BlockStore, StorageError};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{NodeError, NodeResult};
use crate::metrics::NodeMetrics;

/// Default `/receiveFile` body limit
pub const DEFAULT_MAX_BLOCK_BYTES: usize = 2 * blockyard_core::DEFAULT_BLOCK_SIZE;

/// Shared handler state
pub struct NodeState {
    store: Arc<dyn BlockStore>,
    metrics: NodeMetrics,
    max_block_bytes: usize,
}

impl NodeState {
    pub fn new(store: Arc<dyn BlockStore>) -> Self {
        Self {
            store,
            metrics: NodeMetrics::new("blockyard-node"),
            max_block_bytes: DEFAULT_MAX_BLOCK_BYTES,
        }
    }

    pub fn with_metrics(mut self, metrics: NodeMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_max_block_bytes(mut self, bytes: usize) -> Self {
        self.max_block_bytes = bytes;
        self
    }

    pub fn store(&self) -> &Arc<dyn BlockStore> {
        &self.store
    }

    pub fn max_block_bytes(&self) -> usize {
        self.max_block_bytes
    }

    /// Refresh storage gauges from the backend
    pub async fn refresh_storage_metrics(&self) {
        match self.store.stats().await {
            Ok(stats) => self.metrics.update_storage(&stats),
            Err(e) => warn!(error = %e, "Failed to read storage stats"),
        }
    }
}

/// `filename` query parameter
#[derive(Debug, Deserialize)]
pub struct FileQuery {
    pub filename: Option<String>,
}

impl FileQuery {
    fn require(self) -> NodeResult<String> {
        self.filename
            .filter(|name| !name.is_empty())
            .ok_or_else(|| NodeError::BadRequest("missing filename query parameter".into()))
    }
}

/// Usage reply for `/getCurrentNodeSpace`
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeSpace {
    #[serde(rename = "Size")]
    pub size: u64,
}

pub fn routes(max_block_bytes: usize) -> Router<Arc<NodeState>> {
    Router::new()
        .route(
            "/receiveFile",
            post(receive_file).layer(DefaultBodyLimit::max(max_block_bytes)),
        )
        .route("/retrieveFile", get(retrieve_file))
        .route("/checkIfFileExists", get(check_if_file_exists))
        .route("/getCurrentNodeSpace", get(current_node_space))
}

pub async fn health() -> &'static str {
    "OK"
}

fn bad_multipart(e: MultipartError) -> NodeError {
    NodeError::BadRequest(format!("malformed multipart body: {}", e))
}

async fn receive_file(
    State(state): State<Arc<NodeState>>,
    multipart: Multipart,
) -> NodeResult<Json<serde_json::Value>> {
    let started = Instant::now();
    let (name, data) = read_file_field(multipart).await?;
    let size = data.len();

    if let Err(e) = state.store.put(&name, data).await {
        let reason = match &e {
            StorageError::StorageFull { .. } => "full",
            StorageError::InvalidName(_) => "invalid_name",
            StorageError::Io(_) => "io",
        };
        state.metrics.record_rejected(reason);
        warn!(block = %name, bytes = size, error = %e, "Block rejected");
        return Err(e.into());
    }

    state.metrics.record_store(size, started.elapsed());
    state.refresh_storage_metrics().await;
    info!(block = %name, bytes = size, "Block stored");

    Ok(Json(json!({ "fileName": name, "bytes": size })))
}

async fn read_file_field(mut multipart: Multipart) -> NodeResult<(String, Bytes)> {
    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        if field.name() != Some("file") {
            continue;
        }
        let name = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| NodeError::BadRequest("multipart field 'file' has no file name".into()))?;
        let data = field.bytes().await.map_err(bad_multipart)?;
        return Ok((name, data));
    }
    Err(NodeError::BadRequest("multipart field 'file' is missing".into()))
}

async fn retrieve_file(
    State(state): State<Arc<NodeState>>,
    Query(query): Query<FileQuery>,
) -> NodeResult<Response> {
    let started = Instant::now();
    let name = query.require()?;

    let data = state
        .store
        .get(&name)
        .await?
        .ok_or_else(|| NodeError::NotFound(name.clone()))?;

    state.metrics.record_get(data.len(), started.elapsed());
    debug!(block = %name, bytes = data.len(), "Block served");

    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], data).into_response())
}

async fn check_if_file_exists(
    State(state): State<Arc<NodeState>>,
    Query(query): Query<FileQuery>,
) -> NodeResult<Response> {
    let name = query.require()?;

    let response = if state.store.exists(&name).await? {
        (
            StatusCode::OK,
            Json(format!("File: {} found on the node.", name)),
        )
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(format!("File: {} not found on the node.", name)),
        )
    };
    Ok(response.into_response())
}

async fn current_node_space(State(state): State<Arc<NodeState>>) -> NodeResult<Json<NodeSpace>> {
    let size = state.store.usage().await?;
    Ok(Json(NodeSpace { size }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use blockyard_storage::MemoryBlockStore;
    use tower::ServiceExt;

    const BOUNDARY: &str = "blockyard-test-boundary";

    fn app(capacity: u64) -> Router {
        let store: Arc<dyn BlockStore> = Arc::new(MemoryBlockStore::with_capacity(capacity));
        crate::router(Arc::new(NodeState::new(store)), None)
    }

    fn multipart_request(field: &str, file_name: &str, data: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::post("/receiveFile")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_bytes(response: Response) -> Bytes {
        to_bytes(response.into_body(), usize::MAX).await.unwrap()
    }

    #[tokio::test]
    async fn test_receive_and_retrieve() {
        let app = app(0);

        let response = app
            .clone()
            .oneshot(multipart_request("file", "f-block-1.bin", b"block bytes"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(
                Request::get("/retrieveFile?filename=f-block-1.bin")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await.as_ref(), b"block bytes");

        let response = app
            .oneshot(Request::get("/getCurrentNodeSpace").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let space: NodeSpace = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(space, NodeSpace { size: 11 });
    }

    #[tokio::test]
    async fn test_receive_missing_field() {
        let response = app(0)
            .oneshot(multipart_request("other", "x.bin", b"data"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_receive_when_full() {
        let response = app(4)
            .oneshot(multipart_request("file", "big.bin", b"too many bytes"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INSUFFICIENT_STORAGE);
    }

    #[tokio::test]
    async fn test_receive_rejects_traversal() {
        let response = app(0)
            .oneshot(multipart_request("file", "..", b"data"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_retrieve_statuses() {
        let app = app(0);

        let missing = app
            .clone()
            .oneshot(Request::get("/retrieveFile?filename=nope.bin").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let no_param = app
            .oneshot(Request::get("/retrieveFile").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(no_param.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_check_if_file_exists() {
        let app = app(0);
        app.clone()
            .oneshot(multipart_request("file", "here.bin", b"x"))
            .await
            .unwrap();

        let found = app
            .clone()
            .oneshot(Request::get("/checkIfFileExists?filename=here.bin").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(found.status(), StatusCode::OK);
        let message: String = serde_json::from_slice(&body_bytes(found).await).unwrap();
        assert_eq!(message, "File: here.bin found on the node.");

        let absent = app
            .oneshot(Request::get("/checkIfFileExists?filename=gone.bin").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(absent.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(0)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await.as_ref(), b"OK");
    }
}
