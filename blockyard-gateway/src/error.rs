//! HTTP error mapping
//!
//! Errors are returned as `{"error": "<message>", "kind": "<kind>"}` with a
//! status code chosen by kind.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use blockyard_core::{BlockyardError, ErrorKind};
use serde::Serialize;

/// Error returned by API handlers
#[derive(Debug)]
pub struct ApiError(pub BlockyardError);

impl From<BlockyardError> for ApiError {
    fn from(err: BlockyardError) -> Self {
        Self(err)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

/// Status code for an error kind
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Capacity => StatusCode::INSUFFICIENT_STORAGE,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Transport | ErrorKind::Integrity => StatusCode::BAD_GATEWAY,
        ErrorKind::Metadata | ErrorKind::Codec | ErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        status_for(self.0.kind())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.0.to_string(),
            kind: self.0.kind().as_str(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
