//! Whole-file compression codecs
//!
//! Files are compressed once before splitting and decompressed once after
//! reassembly.

use crate::error::{BlockyardError, Result};
use bytes::Bytes;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Default gzip level
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// A reversible transform applied to whole file payloads
pub trait Codec: Send + Sync {
    fn compress(&self, data: &[u8]) -> Result<Bytes>;

    /// Decompress. An empty input yields an empty output.
    fn decompress(&self, data: &[u8]) -> Result<Bytes>;

    fn name(&self) -> &'static str;
}

/// Gzip codec backed by flate2
#[derive(Debug, Clone, Copy)]
pub struct GzipCodec {
    level: u32,
}

impl GzipCodec {
    /// Create a codec with the given level (clamped to 0..=9)
    pub fn new(level: u32) -> Self {
        Self {
            level: level.min(9),
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }
}

impl Default for GzipCodec {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL)
    }
}

impl Codec for GzipCodec {
    fn compress(&self, data: &[u8]) -> Result<Bytes> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::new(self.level));
        encoder
            .write_all(data)
            .map_err(|e| BlockyardError::Codec(format!("gzip compression failed: {}", e)))?;
        let out = encoder
            .finish()
            .map_err(|e| BlockyardError::Codec(format!("gzip compression failed: {}", e)))?;
        Ok(Bytes::from(out))
    }

    fn decompress(&self, data: &[u8]) -> Result<Bytes> {
        if data.is_empty() {
            return Ok(Bytes::new());
        }

        let mut decoder = GzDecoder::new(data);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| BlockyardError::Codec(format!("gzip decompression failed: {}", e)))?;
        Ok(Bytes::from(out))
    }

    fn name(&self) -> &'static str {
        "gzip"
    }
}

/// Pass-through codec
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCodec;

impl Codec for IdentityCodec {
    fn compress(&self, data: &[u8]) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(data))
    }

    fn decompress(&self, data: &[u8]) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(data))
    }

    fn name(&self) -> &'static str {
        "identity"
    }
}
