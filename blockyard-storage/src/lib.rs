//! Blockyard Storage Backend
//!
//! Node-local block storage:
//! - `BlockStore` trait for pluggable storage
//! - `DiskBlockStore` for one-file-per-block persistence
//! - `MemoryBlockStore` for testing and development

pub mod backend;
pub mod disk;
pub mod error;
pub mod memory;

pub use backend::{validate_block_name, BlockStore, StoreStats};
pub use disk::DiskBlockStore;
pub use error::{Result, StorageError};
pub use memory::MemoryBlockStore;

use std::sync::Arc;

/// Which backend a node stores blocks in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    Disk,
    Memory,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "disk" | "fs" | "filesystem" => Ok(BackendKind::Disk),
            "memory" | "mem" => Ok(BackendKind::Memory),
            other => Err(format!("unknown storage backend: {}", other)),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Path to the block directory (disk backend)
    pub path: std::path::PathBuf,

    /// Maximum storage capacity in bytes (0 = unlimited)
    pub max_capacity: u64,

    /// Backend to use
    pub backend: BackendKind,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: std::path::PathBuf::from("./blockyard_data"),
            max_capacity: 0, // Unlimited
            backend: BackendKind::Disk,
        }
    }
}

impl StorageConfig {
    /// Create a new storage config with the given path
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set maximum capacity
    pub fn with_max_capacity(mut self, bytes: u64) -> Self {
        self.max_capacity = bytes;
        self
    }

    /// Set the backend
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Open the configured block store
    pub async fn open(&self) -> Result<Arc<dyn BlockStore>> {
        let store: Arc<dyn BlockStore> = match self.backend {
            BackendKind::Disk => Arc::new(DiskBlockStore::open(&self.path, self.max_capacity).await?),
            BackendKind::Memory => Arc::new(MemoryBlockStore::with_capacity(self.max_capacity)),
        };
        Ok(store)
    }
}
