//! Storage errors

use blockyard_core::BlockyardError;
use thiserror::Error;

/// Result type for block store operations
pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid block name: {0:?}")]
    InvalidName(String),

    #[error("Storage full: {used} bytes used, {requested} requested, capacity {capacity}")]
    StorageFull {
        used: u64,
        requested: u64,
        capacity: u64,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for BlockyardError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidName(name) => {
                BlockyardError::Validation(format!("invalid block name {:?}", name))
            }
            StorageError::StorageFull {
                used,
                requested,
                capacity,
            } => BlockyardError::Capacity {
                node: "local".to_string(),
                usage: used + requested,
                limit: capacity,
            },
            StorageError::Io(e) => BlockyardError::Io(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockyard_core::ErrorKind;

    #[test]
    fn test_conversion_into_unified_error() {
        let err: BlockyardError = StorageError::InvalidName("../etc".into()).into();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err: BlockyardError = StorageError::StorageFull {
            used: 90,
            requested: 20,
            capacity: 100,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Capacity);
    }
}
