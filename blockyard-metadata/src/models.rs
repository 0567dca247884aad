//! Metadata records
//!
//! These structs map directly to the keys the coordinator writes:
//! one manifest per file and one location record per block.

use blockyard_core::BlockDigest;
use serde::{Deserialize, Serialize};

/// Hash field holding the owning node's address
pub const FIELD_NODE_ADDRESS: &str = "node_address";

/// Hash field holding the block's content digest
pub const FIELD_BLOCK_HASH: &str = "block_hash";

/// Where a block lives and what it should hash to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockLocation {
    /// Base URL of the node holding the block
    pub node_address: String,

    /// Digest of the block payload
    pub block_hash: BlockDigest,
}

impl BlockLocation {
    pub fn new(node_address: impl Into<String>, block_hash: BlockDigest) -> Self {
        Self {
            node_address: node_address.into(),
            block_hash,
        }
    }
}

