//! Redis metadata store
//!
//! Layout:
//! - manifest: `SET <manifest key> <block count>`
//! - location: hash at `<block key>` with fields `node_address`, `block_hash`

use crate::models::{BlockLocation, FIELD_BLOCK_HASH, FIELD_NODE_ADDRESS};
use crate::{MetadataError, MetadataStore, Result};
use async_trait::async_trait;
use blockyard_core::BlockDigest;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use tracing::{debug, info};

/// Redis connection configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,
    /// Optional key prefix, joined with `:`
    pub prefix: Option<String>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            prefix: None,
        }
    }
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set a key prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    fn key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, key),
            _ => key.to_string(),
        }
    }
}

/// Metadata store backed by a multiplexed Redis connection
#[derive(Clone)]
pub struct RedisMetadataStore {
    conn: MultiplexedConnection,
    config: RedisConfig,
}

impl RedisMetadataStore {
    /// Connect to Redis
    pub async fn connect(config: RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!(url = %config.url, "Connected to Redis metadata store");
        Ok(Self { conn, config })
    }
}

/// Parse a stored manifest value
fn parse_manifest(key: &str, raw: Option<String>) -> Result<Option<u64>> {
    match raw {
        None => Ok(None),
        Some(value) => value.trim().parse::<u64>().map(Some).map_err(|_| {
            MetadataError::Corrupt(format!("manifest {} holds non-integer {:?}", key, value))
        }),
    }
}

/// Build a location from the `HMGET` reply; a missing field reads as absent
fn parse_location(fields: Vec<Option<String>>) -> Option<BlockLocation> {
    let mut fields = fields.into_iter();
    match (fields.next().flatten(), fields.next().flatten()) {
        (Some(node_address), Some(block_hash)) => Some(BlockLocation::new(
            node_address,
            BlockDigest::from_hex(block_hash),
        )),
        _ => None,
    }
}

#[async_trait]
impl MetadataStore for RedisMetadataStore {
    async fn put_manifest(&self, key: &str, block_count: u64) -> Result<()> {
        let key = self.config.key(key);
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(&key, block_count).await?;
        debug!(key = %key, block_count, "Manifest stored");
        Ok(())
    }

    async fn get_manifest(&self, key: &str) -> Result<Option<u64>> {
        let key = self.config.key(key);
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(&key).await?;
        parse_manifest(&key, raw)
    }

    async fn put_block_location(&self, key: &str, location: &BlockLocation) -> Result<()> {
        let key = self.config.key(key);
        let mut conn = self.conn.clone();
        redis::cmd("HSET")
            .arg(&key)
            .arg(FIELD_NODE_ADDRESS)
            .arg(&location.node_address)
            .arg(FIELD_BLOCK_HASH)
            .arg(location.block_hash.as_str())
            .query_async::<_, ()>(&mut conn)
            .await?;
        debug!(key = %key, node = %location.node_address, "Block location stored");
        Ok(())
    }

    async fn get_block_location(&self, key: &str) -> Result<Option<BlockLocation>> {
        let key = self.config.key(key);
        let mut conn = self.conn.clone();
        let fields: Vec<Option<String>> = redis::cmd("HMGET")
            .arg(&key)
            .arg(FIELD_NODE_ADDRESS)
            .arg(FIELD_BLOCK_HASH)
            .query_async(&mut conn)
            .await?;
        Ok(parse_location(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_config_default() {
        let config = RedisConfig::default();
        assert_eq!(config.url, "redis://127.0.0.1:6379");
        assert_eq!(config.key("abc"), "abc");
    }

    #[test]
    fn test_key_prefix() {
        let config = RedisConfig::new("redis://cache:6379").with_prefix("blockyard");
        assert_eq!(config.key("abc"), "blockyard:abc");
    }

    #[test]
    fn test_parse_manifest() {
        assert_eq!(parse_manifest("k", None).unwrap(), None);
        assert_eq!(parse_manifest("k", Some("3".into())).unwrap(), Some(3));
        assert!(matches!(
            parse_manifest("k", Some("three".into())),
            Err(MetadataError::Corrupt(_))
        ));
    }

    #[test]
    fn test_parse_location_requires_both_fields() {
        let loc = parse_location(vec![Some("http://n1:8081".into()), Some("ab12".into())]).unwrap();
        assert_eq!(loc.node_address, "http://n1:8081");
        assert_eq!(loc.block_hash.as_str(), "ab12");

        assert!(parse_location(vec![Some("http://n1:8081".into()), None]).is_none());
        assert!(parse_location(vec![None, Some("ab12".into())]).is_none());
        assert!(parse_location(vec![None, None]).is_none());
    }
}
