//! Node HTTP errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use blockyard_storage::StorageError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Block {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl NodeError {
    pub fn status(&self) -> StatusCode {
        match self {
            NodeError::BadRequest(_) | NodeError::Storage(StorageError::InvalidName(_)) => {
                StatusCode::BAD_REQUEST
            }
            NodeError::NotFound(_) => StatusCode::NOT_FOUND,
            NodeError::Storage(StorageError::StorageFull { .. }) => {
                StatusCode::INSUFFICIENT_STORAGE
            }
            NodeError::Storage(StorageError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for NodeError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Block request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type NodeResult<T> = Result<T, NodeError>;
