//! Error types for Blockyard
//!
//! Provides a unified error type shared by the coordinator, the storage node
//! and the metadata layer. Every variant maps onto one stable [`ErrorKind`];
//! the message text is informational only.

use thiserror::Error;

/// Result type alias for Blockyard operations
pub type Result<T> = std::result::Result<T, BlockyardError>;

/// Unified error type for Blockyard
#[derive(Error, Debug)]
pub enum BlockyardError {
    // ===== Caller Errors =====
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // ===== Placement Errors =====
    #[error("No storage nodes available: {0}")]
    Unavailable(String),

    #[error("Node {node} is full: {usage} bytes used (limit {limit})")]
    Capacity { node: String, usage: u64, limit: u64 },

    // ===== Node Communication Errors =====
    #[error("Transport error talking to {node}: {message}")]
    Transport { node: String, message: String },

    #[error("Integrity check failed for {block}: expected {expected}, got {actual}")]
    Integrity {
        block: String,
        expected: String,
        actual: String,
    },

    // ===== Backend Errors =====
    #[error("Metadata store error: {0}")]
    Metadata(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ===== Generic Errors =====
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Stable classification of a [`BlockyardError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Unavailable,
    Capacity,
    Transport,
    Integrity,
    Metadata,
    Codec,
    Internal,
}

impl ErrorKind {
    /// Wire name used in JSON error bodies
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Capacity => "capacity",
            ErrorKind::Transport => "transport",
            ErrorKind::Integrity => "integrity",
            ErrorKind::Metadata => "metadata",
            ErrorKind::Codec => "codec",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl BlockyardError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            BlockyardError::Validation(_) => ErrorKind::Validation,
            BlockyardError::NotFound(_) => ErrorKind::NotFound,
            BlockyardError::Unavailable(_) => ErrorKind::Unavailable,
            BlockyardError::Capacity { .. } => ErrorKind::Capacity,
            BlockyardError::Transport { .. } => ErrorKind::Transport,
            BlockyardError::Integrity { .. } => ErrorKind::Integrity,
            BlockyardError::Metadata(_) => ErrorKind::Metadata,
            BlockyardError::Codec(_) => ErrorKind::Codec,
            BlockyardError::Io(_) | BlockyardError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Shorthand for a transport failure against a specific node
    pub fn transport(node: impl Into<String>, message: impl ToString) -> Self {
        BlockyardError::Transport {
            node: node.into(),
            message: message.to_string(),
        }
    }

    /// Transport failures are recovered by evicting the node and reselecting
    pub fn is_retryable(&self) -> bool {
        matches!(self, BlockyardError::Transport { .. })
    }
}
