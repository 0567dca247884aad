//! Blockyard Core Library
//!
//! Core abstractions shared by the Blockyard coordinator and storage nodes.
//! This crate provides:
//! - The block splitter (fixed-size, 1-based positions)
//! - Content addressing (SHA-256 metadata keys and block digests)
//! - Whole-file compression codecs
//! - The unified error taxonomy

pub mod addressing;
pub mod block;
pub mod codec;
pub mod error;

pub use addressing::{block_file_name, block_key, manifest_key, BlockDigest};
pub use block::{concat_blocks, split_into_blocks, Block};
pub use codec::{Codec, GzipCodec, IdentityCodec};
pub use error::{BlockyardError, ErrorKind, Result};

/// One mebibyte
pub const MIB: usize = 1024 * 1024;

/// Default maximum block size
pub const DEFAULT_BLOCK_SIZE: usize = 128 * MIB;

/// Default per-node size used by the capacity policy
///
/// A node is considered full once its usage exceeds twice this value.
pub const DEFAULT_MAX_NODE_SIZE: u64 = 128 * MIB as u64;
