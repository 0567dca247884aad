//! Block store trait
//!
//! Defines the interface that all node-local block stores must follow.

use crate::error::{Result, StorageError};
use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`BlockStore`] methods
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Block store statistics
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    /// Number of blocks stored
    pub block_count: u64,

    /// Total bytes used by blocks
    pub bytes_used: u64,

    /// Total capacity (0 = unlimited)
    pub bytes_capacity: u64,
}

impl StoreStats {
    /// Calculate usage percentage
    pub fn usage_percent(&self) -> f64 {
        if self.bytes_capacity == 0 {
            0.0
        } else {
            (self.bytes_used as f64 / self.bytes_capacity as f64) * 100.0
        }
    }

    /// Available space in bytes
    pub fn bytes_available(&self) -> u64 {
        if self.bytes_capacity == 0 {
            u64::MAX
        } else {
            self.bytes_capacity.saturating_sub(self.bytes_used)
        }
    }
}

/// Async block store keyed by block file name
///
/// All implementations must be Send + Sync for use behind an `Arc` in the
/// node's HTTP handlers.
pub trait BlockStore: Send + Sync {
    /// Store a block, replacing any previous block of the same name
    fn put<'a>(&'a self, name: &'a str, data: Bytes) -> StoreFuture<'a, ()>;

    /// Retrieve a block
    fn get<'a>(&'a self, name: &'a str) -> StoreFuture<'a, Option<Bytes>>;

    /// Check if a block exists
    fn exists<'a>(&'a self, name: &'a str) -> StoreFuture<'a, bool>;

    /// Bytes currently used by stored blocks
    fn usage<'a>(&'a self) -> StoreFuture<'a, u64>;

    /// Get store statistics
    fn stats<'a>(&'a self) -> StoreFuture<'a, StoreStats>;
}

/// Reject names that could escape the store's namespace
pub fn validate_block_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Fail with `StorageFull` if writing `requested` bytes (replacing `replaced`)
/// would exceed `capacity`. A capacity of zero means unlimited.
pub(crate) fn check_capacity(used: u64, replaced: u64, requested: u64, capacity: u64) -> Result<()> {
    if capacity == 0 {
        return Ok(());
    }
    let after = used.saturating_sub(replaced) + requested;
    if after > capacity {
        return Err(StorageError::StorageFull {
            used,
            requested,
            capacity,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_block_name() {
        assert!(validate_block_name("movie.mkv-block-1.bin").is_ok());
        assert!(validate_block_name("").is_err());
        assert!(validate_block_name("a/b").is_err());
        assert!(validate_block_name("a\\b").is_err());
        assert!(validate_block_name("..").is_err());
        assert!(validate_block_name("x..y").is_err());
    }

    #[test]
    fn test_check_capacity() {
        assert!(check_capacity(50, 0, 50, 100).is_ok());
        assert!(check_capacity(50, 0, 51, 100).is_err());
        // Replacing an existing block frees its bytes first
        assert!(check_capacity(100, 40, 40, 100).is_ok());
        // Unlimited
        assert!(check_capacity(u64::MAX / 2, 0, 1024, 0).is_ok());
    }

    #[test]
    fn test_stats_helpers() {
        let stats = StoreStats {
            block_count: 2,
            bytes_used: 25,
            bytes_capacity: 100,
        };
        assert_eq!(stats.usage_percent(), 25.0);
        assert_eq!(stats.bytes_available(), 75);
        assert_eq!(StoreStats::default().bytes_available(), u64::MAX);
    }
}
