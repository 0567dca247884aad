//! Blockyard Metadata Store
//!
//! Durable mapping from file keys to block counts and from block keys to
//! block locations. The coordinator only talks to the [`MetadataStore`]
//! trait; Redis backs it in production and a hash map in tests.
//!
//! # Usage
//!
//! ```ignore
//! use blockyard_metadata::{connect, MetadataBackend, RedisConfig};
//!
//! let store = connect(MetadataBackend::Redis(RedisConfig::default())).await?;
//! store.put_manifest(&manifest_key("a.txt"), 3).await?;
//! ```

pub mod memory;
pub mod models;
pub mod redis_store;

pub use memory::MemoryMetadataStore;
pub use models::BlockLocation;
pub use redis_store::{RedisConfig, RedisMetadataStore};

use async_trait::async_trait;
use blockyard_core::BlockyardError;
use std::sync::Arc;
use thiserror::Error;

/// Metadata store error types
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Corrupt metadata: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, MetadataError>;

impl From<MetadataError> for BlockyardError {
    fn from(err: MetadataError) -> Self {
        BlockyardError::Metadata(err.to_string())
    }
}

/// Narrow interface over the metadata backend
///
/// Each call is atomic per key; there are no cross-key transactions.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Record a file's block count
    async fn put_manifest(&self, key: &str, block_count: u64) -> Result<()>;

    /// Look up a file's block count
    async fn get_manifest(&self, key: &str) -> Result<Option<u64>>;

    /// Record (or overwrite) where a block lives
    async fn put_block_location(&self, key: &str, location: &BlockLocation) -> Result<()>;

    /// Look up where a block lives
    async fn get_block_location(&self, key: &str) -> Result<Option<BlockLocation>>;
}

/// Which metadata backend to use
#[derive(Debug, Clone)]
pub enum MetadataBackend {
    Redis(RedisConfig),
    Memory,
}

/// Open the configured metadata store
pub async fn connect(backend: MetadataBackend) -> Result<Arc<dyn MetadataStore>> {
    let store: Arc<dyn MetadataStore> = match backend {
        MetadataBackend::Redis(config) => Arc::new(RedisMetadataStore::connect(config).await?),
        MetadataBackend::Memory => {
            tracing::warn!("Using in-memory metadata store; file records will not persist");
            Arc::new(MemoryMetadataStore::new())
        }
    };
    Ok(store)
}
