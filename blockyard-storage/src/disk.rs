//! Filesystem block store
//!
//! One file per block under a data directory. Usage is the sum of the sizes
//! of the files in that directory, so it survives restarts.

use crate::backend::{check_capacity, validate_block_name, BlockStore, StoreFuture, StoreStats};
use crate::error::Result;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Filesystem-backed block store
pub struct DiskBlockStore {
    root: PathBuf,

    /// Maximum capacity (0 = unlimited)
    max_capacity: u64,

    /// Serializes writers so the capacity check and the write are atomic
    write_lock: Mutex<()>,
}

impl DiskBlockStore {
    /// Open (creating if needed) a store rooted at `root`
    pub async fn open(root: impl Into<PathBuf>, max_capacity: u64) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        info!(path = %root.display(), max_capacity, "Opened disk block store");

        Ok(Self {
            root,
            max_capacity,
            write_lock: Mutex::new(()),
        })
    }

    /// Data directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn block_path(&self, name: &str) -> Result<PathBuf> {
        validate_block_name(name)?;
        Ok(self.root.join(name))
    }

    async fn file_len(path: &Path) -> Result<Option<u64>> {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn scan(&self) -> Result<StoreStats> {
        let mut stats = StoreStats {
            bytes_capacity: self.max_capacity,
            ..Default::default()
        };

        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            if meta.is_file() {
                stats.block_count += 1;
                stats.bytes_used += meta.len();
            }
        }
        Ok(stats)
    }
}

impl BlockStore for DiskBlockStore {
    fn put<'a>(&'a self, name: &'a str, data: Bytes) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let path = self.block_path(name)?;
            let _guard = self.write_lock.lock().await;

            if self.max_capacity > 0 {
                let used = self.scan().await?.bytes_used;
                let replaced = Self::file_len(&path).await?.unwrap_or(0);
                check_capacity(used, replaced, data.len() as u64, self.max_capacity)?;
            }

            tokio::fs::write(&path, &data).await?;
            debug!(block = name, bytes = data.len(), "Stored block");
            Ok(())
        })
    }

    fn get<'a>(&'a self, name: &'a str) -> StoreFuture<'a, Option<Bytes>> {
        Box::pin(async move {
            let path = self.block_path(name)?;
            match tokio::fs::read(&path).await {
                Ok(data) => Ok(Some(Bytes::from(data))),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn exists<'a>(&'a self, name: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let path = self.block_path(name)?;
            Ok(Self::file_len(&path).await?.is_some())
        })
    }

    fn usage<'a>(&'a self) -> StoreFuture<'a, u64> {
        Box::pin(async move { Ok(self.scan().await?.bytes_used) })
    }

    fn stats<'a>(&'a self) -> StoreFuture<'a, StoreStats> {
        Box::pin(async move { self.scan().await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = DiskBlockStore::open(dir.path(), 0).await.unwrap();

        let data = Bytes::from_static(b"block contents");
        store.put("f-block-1.bin", data.clone()).await.unwrap();

        assert_eq!(store.get("f-block-1.bin").await.unwrap(), Some(data));
        assert!(dir.path().join("f-block-1.bin").exists());
        assert_eq!(store.get("f-block-2.bin").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_usage_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = DiskBlockStore::open(dir.path(), 0).await.unwrap();
            store.put("a", Bytes::from(vec![0u8; 100])).await.unwrap();
            store.put("b", Bytes::from(vec![0u8; 23])).await.unwrap();
        }

        let store = DiskBlockStore::open(dir.path(), 0).await.unwrap();
        assert_eq!(store.usage().await.unwrap(), 123);
        assert_eq!(store.stats().await.unwrap().block_count, 2);
    }

    #[tokio::test]
    async fn test_capacity_limit() {
        let dir = TempDir::new().unwrap();
        let store = DiskBlockStore::open(dir.path(), 64).await.unwrap();

        store.put("a", Bytes::from(vec![0u8; 60])).await.unwrap();
        let result = store.put("b", Bytes::from(vec![0u8; 10])).await;
        assert!(matches!(result, Err(StorageError::StorageFull { .. })));
        assert!(!store.exists("b").await.unwrap());
    }

    #[tokio::test]
    async fn test_exists() {
        let dir = TempDir::new().unwrap();
        let store = DiskBlockStore::open(dir.path(), 0).await.unwrap();

        assert!(!store.exists("a").await.unwrap());
        store.put("a", Bytes::from_static(b"x")).await.unwrap();
        assert!(store.exists("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_path_escape() {
        let dir = TempDir::new().unwrap();
        let store = DiskBlockStore::open(dir.path().join("data"), 0).await.unwrap();

        for name in ["../outside", "nested/name", "..\\win"] {
            let result = store.put(name, Bytes::from_static(b"x")).await;
            assert!(matches!(result, Err(StorageError::InvalidName(_))), "{}", name);
        }
    }
}
