//! Node registry and least-loaded placement
//!
//! The registry keeps two views behind one lock:
//! - the registered addresses (the poll set)
//! - a usage snapshot of the nodes that answered the last poll, sorted
//!   ascending by usage
//!
//! Selection reserves the block size against the chosen node immediately.
//! Reservations are never rolled back; the next usage refresh replaces them
//! with node-reported figures.

use crate::metrics;
use crate::node_client::NodeTransport;
use blockyard_core::{BlockyardError, Result, DEFAULT_MAX_NODE_SIZE};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A storage node and its last-known usage in bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub address: String,
    pub usage: u64,
}

impl Node {
    pub fn new(address: impl Into<String>, usage: u64) -> Self {
        Self {
            address: address.into(),
            usage,
        }
    }
}

/// Capacity policy applied to a selected node
#[derive(Debug, Clone, Copy)]
pub struct PlacementPolicy {
    /// Nominal node size; a node is full once usage exceeds twice this value
    pub max_node_size: u64,
}

impl Default for PlacementPolicy {
    fn default() -> Self {
        Self {
            max_node_size: DEFAULT_MAX_NODE_SIZE,
        }
    }
}

impl PlacementPolicy {
    pub fn new(max_node_size: u64) -> Self {
        Self { max_node_size }
    }

    /// Usage above which a node accepts no more blocks
    pub fn limit(&self) -> u64 {
        self.max_node_size.saturating_mul(2)
    }

    pub fn is_full(&self, usage: u64) -> bool {
        usage > self.limit()
    }
}

#[derive(Default)]
struct RegistryInner {
    addresses: Vec<String>,
    usage: Vec<Node>,
}

/// Validate a node URL and return it without a trailing slash
pub fn normalize_node_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = reqwest::Url::parse(trimmed)
        .map_err(|e| BlockyardError::Validation(format!("invalid node URL {:?}: {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(BlockyardError::Validation(format!(
            "node URL {:?} must use http or https",
            raw
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(BlockyardError::Validation(format!(
            "node URL {:?} has no host",
            raw
        )));
    }

    Ok(trimmed.to_string())
}

/// Order nodes by usage, breaking ties by registration order
fn sort_by_load(nodes: &mut [Node], addresses: &[String]) {
    nodes.sort_by_cached_key(|n| {
        let rank = addresses
            .iter()
            .position(|a| *a == n.address)
            .unwrap_or(usize::MAX);
        (n.usage, rank)
    });
}

/// Live view of storage nodes and their cached usage
pub struct NodeRegistry {
    inner: Mutex<RegistryInner>,
    transport: Arc<dyn NodeTransport>,
}

impl NodeRegistry {
    pub fn new(transport: Arc<dyn NodeTransport>) -> Self {
        Self {
            inner: Mutex::new(RegistryInner::default()),
            transport,
        }
    }

    /// Probe a node and add it to the poll set
    ///
    /// Returns the normalized address. A failing usage refresh afterwards
    /// does not fail the registration.
    pub async fn register_node(&self, url: &str) -> Result<String> {
        let address = normalize_node_url(url)?;

        self.transport.health(&address).await.map_err(|e| {
            BlockyardError::Unavailable(format!("node {} failed health probe: {}", address, e))
        })?;

        let added = {
            let mut inner = self.inner.lock();
            if inner.addresses.contains(&address) {
                false
            } else {
                inner.addresses.push(address.clone());
                true
            }
        };

        if added {
            info!(node = %address, "Registered storage node");
        } else {
            debug!(node = %address, "Storage node already registered");
        }

        if let Err(e) = self.refresh_usage().await {
            warn!(node = %address, error = %e, "Usage refresh after registration failed");
        }

        Ok(address)
    }

    /// Poll every registered node for usage and replace the snapshot
    ///
    /// Nodes that fail to answer are left out of the snapshot but stay
    /// registered.
    pub async fn refresh_usage(&self) -> Result<Vec<Node>> {
        let addresses = self.addresses();
        if addresses.is_empty() {
            return Err(BlockyardError::Unavailable(
                "no storage nodes registered".to_string(),
            ));
        }

        let polls = addresses.iter().map(|address| async move {
            (address, self.transport.usage(address).await)
        });
        let results = futures::future::join_all(polls).await;

        let mut nodes = Vec::with_capacity(results.len());
        for (address, result) in results {
            match result {
                Ok(usage) => nodes.push(Node::new(address.clone(), usage)),
                Err(e) => warn!(node = %address, error = %e, "Usage poll failed"),
            }
        }
        let snapshot = {
            let mut inner = self.inner.lock();
            nodes.retain(|n| inner.addresses.contains(&n.address));
            sort_by_load(&mut nodes, &inner.addresses);
            inner.usage = nodes.clone();
            metrics::set_registered_nodes(inner.addresses.len() as u64);
            nodes
        };

        if snapshot.is_empty() {
            return Err(BlockyardError::Unavailable(
                "no storage node answered the usage poll".to_string(),
            ));
        }

        debug!(responding = snapshot.len(), registered = addresses.len(), "Refreshed node usage");
        Ok(snapshot)
    }

    /// Pick the least-loaded node and reserve `block_size` bytes on it
    ///
    /// The returned node carries its usage from before the reservation.
    pub fn select_and_reserve(&self, block_size: u64) -> Result<Node> {
        let mut inner = self.inner.lock();
        let RegistryInner { addresses, usage } = &mut *inner;
        let first = usage.first_mut().ok_or_else(|| {
            BlockyardError::Unavailable("no storage nodes available".to_string())
        })?;

        let selected = first.clone();
        first.usage = first.usage.saturating_add(block_size);
        sort_by_load(usage, addresses);

        Ok(selected)
    }

    /// Drop a node from the registry; returns whether it was present
    pub fn evict(&self, address: &str) -> bool {
        let mut inner = self.inner.lock();
        let before = (inner.addresses.len(), inner.usage.len());
        inner.addresses.retain(|a| a != address);
        inner.usage.retain(|n| n.address != address);
        let removed = before != (inner.addresses.len(), inner.usage.len());

        if removed {
            metrics::record_node_eviction();
            metrics::set_registered_nodes(inner.addresses.len() as u64);
        }
        removed
    }

    /// Current usage snapshot, ascending by usage
    pub fn snapshot(&self) -> Vec<Node> {
        self.inner.lock().usage.clone()
    }

    /// Registered addresses in registration order
    pub fn addresses(&self) -> Vec<String> {
        self.inner.lock().addresses.clone()
    }

    /// Number of nodes eligible for selection
    pub fn len(&self) -> usize {
        self.inner.lock().usage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().usage.is_empty()
    }
}
