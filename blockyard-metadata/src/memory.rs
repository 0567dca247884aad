//! In-memory metadata store
//!
//! Used for testing and development. Not persistent.

use crate::models::BlockLocation;
use crate::{MetadataStore, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
pub struct MemoryMetadataStore {
    manifests: RwLock<HashMap<String, u64>>,
    locations: RwLock<HashMap<String, BlockLocation>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored location records
    pub fn location_count(&self) -> usize {
        self.locations.read().len()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn put_manifest(&self, key: &str, block_count: u64) -> Result<()> {
        self.manifests.write().insert(key.to_string(), block_count);
        Ok(())
    }

    async fn get_manifest(&self, key: &str) -> Result<Option<u64>> {
        Ok(self.manifests.read().get(key).copied())
    }

    async fn put_block_location(&self, key: &str, location: &BlockLocation) -> Result<()> {
        self.locations
            .write()
            .insert(key.to_string(), location.clone());
        Ok(())
    }

    async fn get_block_location(&self, key: &str) -> Result<Option<BlockLocation>> {
        Ok(self.locations.read().get(key).cloned())
    }
}
