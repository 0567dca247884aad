//! In-memory block store
//!
//! Used for testing and development. Not persistent.

use crate::backend::{check_capacity, validate_block_name, BlockStore, StoreFuture, StoreStats};
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;

/// In-memory block store
#[derive(Default)]
pub struct MemoryBlockStore {
    blocks: RwLock<HashMap<String, Bytes>>,

    /// Maximum capacity (0 = unlimited)
    max_capacity: u64,
}

impl MemoryBlockStore {
    /// Create a new unlimited store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with a maximum capacity
    pub fn with_capacity(max_bytes: u64) -> Self {
        Self {
            blocks: RwLock::new(HashMap::new()),
            max_capacity: max_bytes,
        }
    }

    fn bytes_used(blocks: &HashMap<String, Bytes>) -> u64 {
        blocks.values().map(|b| b.len() as u64).sum()
    }
}

impl BlockStore for MemoryBlockStore {
    fn put<'a>(&'a self, name: &'a str, data: Bytes) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            validate_block_name(name)?;

            let mut blocks = self.blocks.write();
            let replaced = blocks.get(name).map(|b| b.len() as u64).unwrap_or(0);
            check_capacity(
                Self::bytes_used(&blocks),
                replaced,
                data.len() as u64,
                self.max_capacity,
            )?;

            blocks.insert(name.to_string(), data);
            Ok(())
        })
    }

    fn get<'a>(&'a self, name: &'a str) -> StoreFuture<'a, Option<Bytes>> {
        Box::pin(async move {
            validate_block_name(name)?;
            Ok(self.blocks.read().get(name).cloned())
        })
    }

    fn exists<'a>(&'a self, name: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            validate_block_name(name)?;
            Ok(self.blocks.read().contains_key(name))
        })
    }

    fn usage<'a>(&'a self) -> StoreFuture<'a, u64> {
        Box::pin(async move { Ok(Self::bytes_used(&self.blocks.read())) })
    }

    fn stats<'a>(&'a self) -> StoreFuture<'a, StoreStats> {
        Box::pin(async move {
            let blocks = self.blocks.read();
            Ok(StoreStats {
                block_count: blocks.len() as u64,
                bytes_used: Self::bytes_used(&blocks),
                bytes_capacity: self.max_capacity,
            })
        })
    }
}
