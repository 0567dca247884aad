//! In-memory node transport for unit tests

use crate::node_client::NodeTransport;
use async_trait::async_trait;
use blockyard_core::{BlockyardError, Result};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Default)]
struct FakeNode {
    base_usage: u64,
    down: bool,
    reject_stores: bool,
    blocks: HashMap<String, Bytes>,
}

/// Simulated pool of storage nodes keyed by address
#[derive(Default)]
pub struct FakeTransport {
    nodes: Mutex<HashMap<String, FakeNode>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&self, address: &str, usage: u64) {
        self.nodes.lock().insert(
            address.to_string(),
            FakeNode {
                base_usage: usage,
                ..Default::default()
            },
        );
    }

    /// Make every call to the node fail
    pub fn set_down(&self, address: &str, down: bool) {
        if let Some(node) = self.nodes.lock().get_mut(address) {
            node.down = down;
        }
    }

    /// Make stores to the node fail while it stays healthy
    pub fn reject_stores(&self, address: &str) {
        if let Some(node) = self.nodes.lock().get_mut(address) {
            node.reject_stores = true;
        }
    }

    /// Overwrite a stored block's payload
    pub fn corrupt(&self, address: &str, block_file: &str, data: &'static [u8]) {
        if let Some(node) = self.nodes.lock().get_mut(address) {
            node.blocks
                .insert(block_file.to_string(), Bytes::from_static(data));
        }
    }

    /// Names of the blocks stored on a node
    pub fn blocks_on(&self, address: &str) -> Vec<String> {
        let nodes = self.nodes.lock();
        let mut names: Vec<String> = nodes
            .get(address)
            .map(|n| n.blocks.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    fn with_node<T>(&self, address: &str, f: impl FnOnce(&mut FakeNode) -> Result<T>) -> Result<T> {
        let mut nodes = self.nodes.lock();
        match nodes.get_mut(address) {
            Some(node) if !node.down => f(node),
            _ => Err(BlockyardError::transport(address, "connection refused")),
        }
    }
}

#[async_trait]
impl NodeTransport for FakeTransport {
    async fn health(&self, node: &str) -> Result<()> {
        self.with_node(node, |_| Ok(()))
    }

    async fn usage(&self, node: &str) -> Result<u64> {
        self.with_node(node, |n| {
            Ok(n.base_usage + n.blocks.values().map(|b| b.len() as u64).sum::<u64>())
        })
    }

    async fn store(&self, node: &str, block_file: &str, data: Bytes) -> Result<()> {
        self.with_node(node, |n| {
            if n.reject_stores {
                return Err(BlockyardError::transport(node, "HTTP 500 Internal Server Error"));
            }
            n.blocks.insert(block_file.to_string(), data);
            Ok(())
        })
    }

    async fn fetch(&self, node: &str, block_file: &str) -> Result<Bytes> {
        self.with_node(node, |n| {
            n.blocks
                .get(block_file)
                .cloned()
                .ok_or_else(|| BlockyardError::transport(node, "HTTP 404 Not Found"))
        })
    }
}
