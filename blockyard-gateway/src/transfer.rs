//! Block Transfer Coordinator
//!
//! Uploads every block of a file concurrently. Each block task selects the
//! least-loaded node, records the location, and sends the payload; a node
//! that fails the transfer is evicted and the block is placed again.
//!
//! Uploads are not atomic. Blocks that landed before a sibling failed stay
//! where they are, and location records are written before the transfer
//! they describe is confirmed.

use crate::metrics;
use crate::node_client::NodeTransport;
use crate::registry::{NodeRegistry, PlacementPolicy};
use blockyard_core::{block_file_name, block_key, Block, BlockyardError, Result};
use blockyard_metadata::{BlockLocation, MetadataStore};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Fans block uploads out across storage nodes
#[derive(Clone)]
pub struct TransferCoordinator {
    registry: Arc<NodeRegistry>,
    metadata: Arc<dyn MetadataStore>,
    transport: Arc<dyn NodeTransport>,
    policy: PlacementPolicy,
}

impl TransferCoordinator {
    pub fn new(
        registry: Arc<NodeRegistry>,
        metadata: Arc<dyn MetadataStore>,
        transport: Arc<dyn NodeTransport>,
        policy: PlacementPolicy,
    ) -> Self {
        Self {
            registry,
            metadata,
            transport,
            policy,
        }
    }

    /// Upload all blocks, one task per block
    ///
    /// Waits for every task and returns the first error received.
    pub async fn distribute(&self, file_name: &str, blocks: Vec<Block>) -> Result<()> {
        let block_count = blocks.len();
        let (tx, mut rx) = mpsc::channel(block_count.max(1));
        let file_name: Arc<str> = Arc::from(file_name);

        let mut handles = Vec::with_capacity(block_count);
        for block in blocks {
            let coordinator = self.clone();
            let file_name = file_name.clone();
            let tx = tx.clone();
            handles.push(tokio::spawn(async move {
                let position = block.position();
                let outcome = coordinator.place_block(&file_name, block).await;
                let _ = tx.send((position, outcome)).await;
            }));
        }
        drop(tx);

        let mut first_error = None;
        while let Some((position, outcome)) = rx.recv().await {
            match outcome {
                Ok(node) => debug!(file = %file_name, position, node = %node, "Block placed"),
                Err(e) => {
                    warn!(file = %file_name, position, error = %e, "Block upload failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        for handle in handles {
            if let Err(e) = handle.await {
                first_error.get_or_insert(BlockyardError::Internal(format!(
                    "block upload task failed: {}",
                    e
                )));
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!(file = %file_name, blocks = block_count, "File distributed");
                Ok(())
            }
        }
    }

    /// Place one block, evicting failed nodes until it lands or none remain
    ///
    /// Returns the address of the node holding the block.
    async fn place_block(&self, file_name: &str, block: Block) -> Result<String> {
        let position = block.position();
        let key = block_key(file_name, position);
        let block_file = block_file_name(file_name, position);
        let digest = block.digest();
        let size = block.len() as u64;

        loop {
            let node = self.registry.select_and_reserve(size)?;

            if self.policy.is_full(node.usage) {
                metrics::record_block_transfer_failure("capacity");
                return Err(BlockyardError::Capacity {
                    node: node.address,
                    usage: node.usage,
                    limit: self.policy.limit(),
                });
            }

            let location = BlockLocation::new(node.address.clone(), digest.clone());
            if let Err(e) = self.metadata.put_block_location(&key, &location).await {
                metrics::record_block_transfer_failure("metadata");
                return Err(e.into());
            }

            match self
                .transport
                .store(&node.address, &block_file, block.bytes().clone())
                .await
            {
                Ok(()) => return Ok(node.address),
                Err(e) => {
                    metrics::record_block_transfer_failure("transport");
                    warn!(
                        node = %node.address,
                        position,
                        error = %e,
                        "Block transfer failed, evicting node"
                    );
                    self.registry.evict(&node.address);

                    if self.registry.is_empty() {
                        return Err(BlockyardError::Unavailable(format!(
                            "every node failed while storing block {} of {}",
                            position, file_name
                        )));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTransport;
    use blockyard_core::split_into_blocks;
    use blockyard_metadata::MemoryMetadataStore;
    use bytes::Bytes;

    struct Fixture {
        coordinator: TransferCoordinator,
        registry: Arc<NodeRegistry>,
        metadata: Arc<MemoryMetadataStore>,
        transport: Arc<FakeTransport>,
    }

    async fn fixture(nodes: &[(&str, u64)], policy: PlacementPolicy) -> Fixture {
        let transport = Arc::new(FakeTransport::new());
        for (address, usage) in nodes {
            transport.add_node(address, *usage);
        }
        let registry = Arc::new(NodeRegistry::new(transport.clone()));
        for (address, _) in nodes {
            registry.register_node(address).await.unwrap();
        }
        let metadata = Arc::new(MemoryMetadataStore::new());
        let coordinator = TransferCoordinator::new(
            registry.clone(),
            metadata.clone(),
            transport.clone(),
            policy,
        );
        Fixture {
            coordinator,
            registry,
            metadata,
            transport,
        }
    }

    fn blocks(len: usize, block_size: usize) -> Vec<Block> {
        let payload = Bytes::from((0..len).map(|i| (i % 256) as u8).collect::<Vec<_>>());
        split_into_blocks(payload, block_size).unwrap()
    }

    #[tokio::test]
    async fn test_distribute_spreads_blocks() {
        let f = fixture(&[("http://a", 0), ("http://b", 0)], PlacementPolicy::default()).await;

        f.coordinator
            .distribute("data.bin", blocks(40, 10))
            .await
            .unwrap();

        // 4 full blocks plus an empty tail
        let placed = f.transport.blocks_on("http://a").len() + f.transport.blocks_on("http://b").len();
        assert_eq!(placed, 5);
        assert!(!f.transport.blocks_on("http://a").is_empty());
        assert!(!f.transport.blocks_on("http://b").is_empty());
        assert_eq!(f.metadata.location_count(), 5);
    }

    #[tokio::test]
    async fn test_failover_evicts_failing_node() {
        let f = fixture(&[("http://bad", 0), ("http://good", 50)], PlacementPolicy::default()).await;
        f.transport.reject_stores("http://bad");

        f.coordinator
            .distribute("data.bin", blocks(25, 10))
            .await
            .unwrap();

        assert_eq!(f.registry.addresses(), vec!["http://good".to_string()]);
        assert!(f.transport.blocks_on("http://bad").is_empty());
        assert_eq!(f.transport.blocks_on("http://good").len(), 3);

        for position in 1..=3 {
            let location = f
                .metadata
                .get_block_location(&block_key("data.bin", position))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(location.node_address, "http://good");
        }
    }

    #[tokio::test]
    async fn test_all_nodes_failing_is_unavailable() {
        let f = fixture(&[("http://x", 0), ("http://y", 0)], PlacementPolicy::default()).await;
        f.transport.reject_stores("http://x");
        f.transport.reject_stores("http://y");

        let err = f
            .coordinator
            .distribute("data.bin", blocks(5, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, BlockyardError::Unavailable(_)));
        assert!(f.registry.is_empty());
    }

    #[tokio::test]
    async fn test_full_node_is_rejected_without_transfer() {
        let f = fixture(&[("http://full", 300)], PlacementPolicy::new(100)).await;

        let err = f
            .coordinator
            .distribute("data.bin", blocks(5, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, BlockyardError::Capacity { limit: 200, .. }));
        assert!(f.transport.blocks_on("http://full").is_empty());
        assert_eq!(f.metadata.location_count(), 0);
    }

    #[tokio::test]
    async fn test_location_records_carry_digest() {
        let f = fixture(&[("http://a", 0)], PlacementPolicy::default()).await;
        let blocks = blocks(12, 8);
        let expected: Vec<_> = blocks.iter().map(|b| b.digest()).collect();

        f.coordinator.distribute("d", blocks).await.unwrap();

        for (i, digest) in expected.iter().enumerate() {
            let location = f
                .metadata
                .get_block_location(&block_key("d", i as u32 + 1))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(&location.block_hash, digest);
        }
    }
}
