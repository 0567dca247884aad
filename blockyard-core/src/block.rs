//! Block types and the block splitter
//!
//! Blocks are the unit of placement in Blockyard. A file's compressed payload
//! is cut into fixed-size blocks numbered from 1, and each block is stored on
//! one node.

use crate::addressing::BlockDigest;
use crate::error::{BlockyardError, Result};
use bytes::{Bytes, BytesMut};
use std::fmt;

/// A contiguous slice of a file payload tagged with its 1-based position
#[derive(Clone, PartialEq, Eq)]
pub struct Block {
    position: u32,
    data: Bytes,
}

impl Block {
    /// Create a block at the given position
    pub fn new(position: u32, data: impl Into<Bytes>) -> Self {
        Self {
            position,
            data: data.into(),
        }
    }

    /// 1-based position within the file
    pub fn position(&self) -> u32 {
        self.position
    }

    /// Block payload
    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    /// Consume the block, returning its payload
    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Integrity digest of the payload
    pub fn digest(&self) -> BlockDigest {
        BlockDigest::compute(&self.data)
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("position", &self.position)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Split a payload into blocks of at most `max_block_size` bytes
///
/// An empty payload yields a single empty block. When the payload is at
/// least one block long, `len / max_block_size` full blocks are followed by a
/// remainder block, which is empty on exact multiples. Slices share the
/// payload's buffer.
pub fn split_into_blocks(payload: Bytes, max_block_size: usize) -> Result<Vec<Block>> {
    if max_block_size == 0 {
        return Err(BlockyardError::Validation(
            "block size must be greater than zero".to_string(),
        ));
    }

    let len = payload.len();
    if len < max_block_size {
        return Ok(vec![Block::new(1, payload)]);
    }

    let full = len / max_block_size;
    let mut blocks = Vec::with_capacity(full + 1);
    for i in 0..full {
        let start = i * max_block_size;
        let position = u32::try_from(i + 1)
            .map_err(|_| BlockyardError::Validation("payload has too many blocks".to_string()))?;
        blocks.push(Block::new(position, payload.slice(start..start + max_block_size)));
    }

    let position = u32::try_from(full + 1)
        .map_err(|_| BlockyardError::Validation("payload has too many blocks".to_string()))?;
    blocks.push(Block::new(position, payload.slice(full * max_block_size..)));

    Ok(blocks)
}

/// Concatenate block payloads in ascending position order
pub fn concat_blocks(blocks: &[Block]) -> Bytes {
    let mut sorted: Vec<&Block> = blocks.iter().collect();
    sorted.sort_by_key(|b| b.position);

    let total: usize = sorted.iter().map(|b| b.len()).sum();
    let mut out = BytesMut::with_capacity(total);
    for block in sorted {
        out.extend_from_slice(&block.data);
    }
    out.freeze()
}
