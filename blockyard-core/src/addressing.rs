//! Content addressing for Blockyard
//!
//! Provides:
//! - Deterministic metadata keys derived from file names
//! - SHA-256 block digests used for integrity checks on download
//!
//! Keys and digests are lowercase hex SHA-256. Both ends must agree on the
//! algorithm since digests are compared as opaque strings.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Separator between a file name and a block position
pub const BLOCK_SEPARATOR: &str = "-block-";

/// Extension of block files stored on nodes
pub const BLOCK_FILE_EXTENSION: &str = ".bin";

/// Hex SHA-256 of arbitrary bytes
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Metadata key holding a file's block count
pub fn manifest_key(file_name: &str) -> String {
    sha256_hex(file_name.as_bytes())
}

/// Logical name of a block: `<file>-block-<position>`
pub fn block_name(file_name: &str, position: u32) -> String {
    format!("{}{}{}", file_name, BLOCK_SEPARATOR, position)
}

/// Metadata key holding a block's location record
pub fn block_key(file_name: &str, position: u32) -> String {
    sha256_hex(block_name(file_name, position).as_bytes())
}

/// Name a block is stored under on its node: `<file>-block-<position>.bin`
pub fn block_file_name(file_name: &str, position: u32) -> String {
    format!("{}{}", block_name(file_name, position), BLOCK_FILE_EXTENSION)
}

/// Integrity digest of a block payload
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockDigest(String);

impl BlockDigest {
    /// Compute the digest of a payload
    pub fn compute(data: &[u8]) -> Self {
        Self(sha256_hex(data))
    }

    /// Wrap a digest previously rendered with [`BlockDigest::as_str`]
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Hex rendering
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Verify that data matches this digest
    pub fn verify(&self, data: &[u8]) -> bool {
        Self::compute(data) == *self
    }
}

impl fmt::Debug for BlockDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = self.0.get(..16).unwrap_or(self.0.as_str());
        write!(f, "BlockDigest({})", short)
    }
}

impl fmt::Display for BlockDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
