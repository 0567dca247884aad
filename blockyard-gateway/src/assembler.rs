//! File Assembler
//!
//! Rebuilds a file from its blocks: reads the manifest, fetches each block
//! from the node recorded for it, checks the digest, concatenates in
//! position order and decompresses once.

use crate::node_client::NodeTransport;
use blockyard_core::addressing::block_name;
use blockyard_core::{
    block_file_name, block_key, concat_blocks, manifest_key, Block, BlockDigest, BlockyardError,
    Codec, Result,
};
use blockyard_metadata::MetadataStore;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct FileAssembler {
    metadata: Arc<dyn MetadataStore>,
    transport: Arc<dyn NodeTransport>,
    codec: Arc<dyn Codec>,
    download_concurrency: usize,
}

impl FileAssembler {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        transport: Arc<dyn NodeTransport>,
        codec: Arc<dyn Codec>,
    ) -> Self {
        Self {
            metadata,
            transport,
            codec,
            download_concurrency: 1,
        }
    }

    /// Fetch up to `n` blocks ahead; output order is unaffected
    pub fn with_download_concurrency(mut self, n: usize) -> Self {
        self.download_concurrency = n.max(1);
        self
    }

    /// Reassemble a file. Nothing is returned unless every block verifies.
    pub async fn assemble(&self, file_name: &str) -> Result<Bytes> {
        let count = self
            .metadata
            .get_manifest(&manifest_key(file_name))
            .await?
            .ok_or_else(|| BlockyardError::NotFound(format!("file {} not found", file_name)))?;
        let count = u32::try_from(count).map_err(|_| {
            BlockyardError::Metadata(format!("manifest for {} has bad block count {}", file_name, count))
        })?;

        let mut fetches = stream::iter(1..=count)
            .map(|position| self.fetch_block(file_name, position))
            .buffered(self.download_concurrency);

        let mut blocks = Vec::with_capacity(count as usize);
        while let Some(block) = fetches.next().await {
            blocks.push(block?);
        }

        let payload = concat_blocks(&blocks);
        let data = self.codec.decompress(&payload)?;

        info!(
            file = %file_name,
            blocks = count,
            stored_bytes = payload.len(),
            bytes = data.len(),
            "File assembled"
        );
        Ok(data)
    }

    async fn fetch_block(&self, file_name: &str, position: u32) -> Result<Block> {
        let location = self
            .metadata
            .get_block_location(&block_key(file_name, position))
            .await?
            .ok_or_else(|| {
                BlockyardError::NotFound(format!("block {} of {} has no location", position, file_name))
            })?;

        let data = self
            .transport
            .fetch(&location.node_address, &block_file_name(file_name, position))
            .await
            .map_err(|e| {
                warn!(node = %location.node_address, position, error = %e, "Block fetch failed");
                BlockyardError::Unavailable(format!(
                    "block {} of {} unavailable: {}",
                    position, file_name, e
                ))
            })?;

        let actual = BlockDigest::compute(&data);
        if actual != location.block_hash {
            return Err(BlockyardError::Integrity {
                block: block_name(file_name, position),
                expected: location.block_hash.to_string(),
                actual: actual.to_string(),
            });
        }

        debug!(node = %location.node_address, position, bytes = data.len(), "Block verified");
        Ok(Block::new(position, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{NodeRegistry, PlacementPolicy};
    use crate::testing::FakeTransport;
    use crate::transfer::TransferCoordinator;
    use blockyard_core::{split_into_blocks, GzipCodec, IdentityCodec};
    use blockyard_metadata::MemoryMetadataStore;

    struct Fixture {
        transfer: TransferCoordinator,
        metadata: Arc<MemoryMetadataStore>,
        transport: Arc<FakeTransport>,
    }

    async fn fixture(nodes: &[&str]) -> Fixture {
        let transport = Arc::new(FakeTransport::new());
        for address in nodes {
            transport.add_node(address, 0);
        }
        let registry = Arc::new(NodeRegistry::new(transport.clone()));
        for address in nodes {
            registry.register_node(address).await.unwrap();
        }
        let metadata = Arc::new(MemoryMetadataStore::new());
        let transfer = TransferCoordinator::new(
            registry,
            metadata.clone(),
            transport.clone(),
            PlacementPolicy::default(),
        );
        Fixture {
            transfer,
            metadata,
            transport,
        }
    }

    impl Fixture {
        fn assembler(&self, codec: Arc<dyn Codec>) -> FileAssembler {
            FileAssembler::new(self.metadata.clone(), self.transport.clone(), codec)
        }

        async fn store(&self, name: &str, payload: Bytes, block_size: usize) -> u64 {
            let blocks = split_into_blocks(payload, block_size).unwrap();
            let count = blocks.len() as u64;
            self.metadata
                .put_manifest(&manifest_key(name), count)
                .await
                .unwrap();
            self.transfer.distribute(name, blocks).await.unwrap();
            count
        }
    }

    fn payload(len: usize) -> Bytes {
        Bytes::from((0..len).map(|i| (i * 7 % 256) as u8).collect::<Vec<_>>())
    }

    #[tokio::test]
    async fn test_roundtrip_various_block_sizes() {
        let f = fixture(&["http://a", "http://b", "http://c"]).await;
        let data = payload(1000);

        for (i, block_size) in [1usize, 7, 100, 250, 1000, 4096].into_iter().enumerate() {
            let name = format!("file-{}", i);
            f.store(&name, data.clone(), block_size).await;

            for concurrency in [1, 4] {
                let out = f
                    .assembler(Arc::new(IdentityCodec))
                    .with_download_concurrency(concurrency)
                    .assemble(&name)
                    .await
                    .unwrap();
                assert_eq!(out, data, "block size {}", block_size);
            }
        }
    }

    #[tokio::test]
    async fn test_roundtrip_with_gzip() {
        let f = fixture(&["http://a", "http://b"]).await;
        let codec = GzipCodec::default();
        let data = Bytes::from(b"the quick brown fox ".repeat(500));

        let compressed = codec.compress(&data).unwrap();
        f.store("fox.txt", compressed, 64).await;

        let out = f.assembler(Arc::new(codec)).assemble("fox.txt").await.unwrap();
        assert_eq!(out, data);
    }

    #[tokio::test]
    async fn test_unknown_file_is_not_found() {
        let f = fixture(&["http://a"]).await;
        let err = f
            .assembler(Arc::new(IdentityCodec))
            .assemble("missing")
            .await
            .unwrap_err();
        assert!(matches!(err, BlockyardError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_location_is_not_found() {
        let f = fixture(&["http://a"]).await;
        f.metadata.put_manifest(&manifest_key("ghost"), 2).await.unwrap();

        let err = f
            .assembler(Arc::new(IdentityCodec))
            .assemble("ghost")
            .await
            .unwrap_err();
        assert!(matches!(err, BlockyardError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_corrupted_block_is_integrity_error() {
        let f = fixture(&["http://a"]).await;
        f.store("doc", payload(30), 10).await;
        f.transport.corrupt("http://a", &block_file_name("doc", 2), b"tampered!!");

        let err = f
            .assembler(Arc::new(IdentityCodec))
            .assemble("doc")
            .await
            .unwrap_err();
        match err {
            BlockyardError::Integrity { block, .. } => assert_eq!(block, "doc-block-2"),
            other => panic!("expected integrity error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_node_down_is_unavailable() {
        let f = fixture(&["http://a"]).await;
        f.store("doc", payload(30), 10).await;
        f.transport.set_down("http://a", true);

        let err = f
            .assembler(Arc::new(IdentityCodec))
            .assemble("doc")
            .await
            .unwrap_err();
        assert!(matches!(err, BlockyardError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_empty_file_roundtrip() {
        let f = fixture(&["http://a"]).await;
        let codec = GzipCodec::default();
        f.store("empty", codec.compress(&[]).unwrap(), 16).await;

        let out = f.assembler(Arc::new(codec)).assemble("empty").await.unwrap();
        assert!(out.is_empty());
    }
}
