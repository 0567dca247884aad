//! Application State
//!
//! Shared state for all coordinator components: the node registry, the
//! metadata store, and the upload and download pipelines built on them.

use blockyard_core::{
    manifest_key, split_into_blocks, BlockyardError, Codec, GzipCodec, Result, DEFAULT_BLOCK_SIZE,
    DEFAULT_MAX_NODE_SIZE,
};
use blockyard_metadata::{MetadataBackend, MetadataStore, RedisConfig};
use bytes::Bytes;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::assembler::FileAssembler;
use crate::metrics;
use crate::node_client::{HttpNodeClient, NodeClientConfig, NodeTransport};
use crate::registry::{NodeRegistry, PlacementPolicy};
use crate::transfer::TransferCoordinator;

/// Coordinator configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// HTTP listen address
    pub listen_addr: String,

    /// Redis connection URL
    pub redis_url: String,

    /// Keep metadata in memory instead of Redis (development only)
    pub use_memory_metadata: bool,

    /// Maximum block size in bytes
    pub block_size: usize,

    /// Nominal node size used by the capacity policy
    pub max_node_size: u64,

    /// Timeout for each call to a storage node
    pub request_timeout: Duration,

    /// Blocks fetched ahead during download (1 = sequential)
    pub download_concurrency: usize,

    /// Interval of the background usage refresh (zero disables it)
    pub monitor_interval: Duration,

    /// Largest accepted upload body
    pub max_upload_bytes: usize,

    /// Gzip level applied to whole files
    pub compression_level: u32,

    /// Serve /metrics
    pub enable_metrics: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            use_memory_metadata: false,
            block_size: DEFAULT_BLOCK_SIZE,
            max_node_size: DEFAULT_MAX_NODE_SIZE,
            request_timeout: Duration::from_secs(5),
            download_concurrency: 1,
            monitor_interval: Duration::from_secs(30),
            max_upload_bytes: 1024 * 1024 * 1024, // 1 GB
            compression_level: blockyard_core::codec::DEFAULT_COMPRESSION_LEVEL,
            enable_metrics: true,
        }
    }
}

impl GatewayConfig {
    /// Config for tests and local development: in-memory metadata, no monitor
    pub fn development() -> Self {
        Self {
            use_memory_metadata: true,
            monitor_interval: Duration::ZERO,
            enable_metrics: false,
            ..Default::default()
        }
    }

    pub fn with_block_size(mut self, bytes: usize) -> Self {
        self.block_size = bytes;
        self
    }

    pub fn with_max_node_size(mut self, bytes: u64) -> Self {
        self.max_node_size = bytes;
        self
    }

    pub fn with_download_concurrency(mut self, n: usize) -> Self {
        self.download_concurrency = n;
        self
    }

    /// Metadata backend selected by this config
    pub fn metadata_backend(&self) -> MetadataBackend {
        if self.use_memory_metadata {
            MetadataBackend::Memory
        } else {
            MetadataBackend::Redis(RedisConfig::new(self.redis_url.clone()))
        }
    }

    /// Check values that would otherwise fail later at runtime
    pub fn validate(&self) -> Result<()> {
        self.listen_addr.parse::<SocketAddr>().map_err(|e| {
            BlockyardError::Validation(format!("invalid listen address {}: {}", self.listen_addr, e))
        })?;
        if self.block_size == 0 {
            return Err(BlockyardError::Validation("block size must be greater than zero".into()));
        }
        if self.download_concurrency == 0 {
            return Err(BlockyardError::Validation(
                "download concurrency must be at least 1".into(),
            ));
        }
        if self.compression_level > 9 {
            return Err(BlockyardError::Validation(format!(
                "compression level {} is out of range 0-9",
                self.compression_level
            )));
        }
        Ok(())
    }
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub file_name: String,
    pub blocks: u64,
    pub bytes: u64,
}

/// Reject names that cannot be stored as node-side block files
pub fn validate_file_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(BlockyardError::Validation("file name is empty".into()));
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(BlockyardError::Validation(format!(
            "file name {:?} may not contain path separators or '..'",
            name
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(BlockyardError::Validation(format!(
            "file name {:?} contains control characters",
            name
        )));
    }
    Ok(())
}

/// Application state shared across all handlers
pub struct AppState {
    config: GatewayConfig,
    registry: Arc<NodeRegistry>,
    metadata: Arc<dyn MetadataStore>,
    codec: Arc<dyn Codec>,
    transfer: TransferCoordinator,
    assembler: FileAssembler,
}

impl AppState {
    /// Create application state with configuration
    pub async fn with_config(config: GatewayConfig) -> Result<Self> {
        config.validate()?;

        let metadata = blockyard_metadata::connect(config.metadata_backend()).await?;
        let transport = Arc::new(HttpNodeClient::new(NodeClientConfig {
            request_timeout: config.request_timeout,
            ..Default::default()
        })?);
        let codec = Arc::new(GzipCodec::new(config.compression_level));

        Ok(Self::from_parts(config, metadata, transport, codec))
    }

    /// Assemble state from already-built components
    pub fn from_parts(
        config: GatewayConfig,
        metadata: Arc<dyn MetadataStore>,
        transport: Arc<dyn NodeTransport>,
        codec: Arc<dyn Codec>,
    ) -> Self {
        let registry = Arc::new(NodeRegistry::new(transport.clone()));
        let transfer = TransferCoordinator::new(
            registry.clone(),
            metadata.clone(),
            transport.clone(),
            PlacementPolicy::new(config.max_node_size),
        );
        let assembler = FileAssembler::new(metadata.clone(), transport, codec.clone())
            .with_download_concurrency(config.download_concurrency);

        info!(
            block_size = config.block_size,
            max_node_size = config.max_node_size,
            codec = codec.name(),
            download_concurrency = config.download_concurrency,
            "Coordinator state initialized"
        );

        Self {
            config,
            registry,
            metadata,
            codec,
            transfer,
            assembler,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    // =========================================================================
    // FILE OPERATIONS
    // =========================================================================

    /// Compress, split and distribute a file
    ///
    /// The manifest is written before any block is placed.
    pub async fn upload(&self, file_name: &str, data: Bytes) -> Result<UploadSummary> {
        validate_file_name(file_name)?;
        let size = data.len() as u64;

        let codec = self.codec.clone();
        let compressed = tokio::task::spawn_blocking(move || codec.compress(&data))
            .await
            .map_err(|e| BlockyardError::Internal(format!("compression task failed: {}", e)))??;

        let blocks = split_into_blocks(compressed, self.config.block_size)?;
        let block_count = blocks.len() as u64;

        self.registry.refresh_usage().await?;
        self.metadata
            .put_manifest(&manifest_key(file_name), block_count)
            .await?;
        self.transfer.distribute(file_name, blocks).await?;

        metrics::record_bytes_uploaded(size);
        info!(file = %file_name, bytes = size, blocks = block_count, "Upload complete");

        Ok(UploadSummary {
            file_name: file_name.to_string(),
            blocks: block_count,
            bytes: size,
        })
    }

    /// Reassemble a previously uploaded file
    pub async fn download(&self, file_name: &str) -> Result<Bytes> {
        validate_file_name(file_name)?;
        let data = self.assembler.assemble(file_name).await?;
        metrics::record_bytes_downloaded(data.len() as u64);
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTransport;
    use blockyard_core::IdentityCodec;
    use blockyard_metadata::MemoryMetadataStore;

    async fn state_with(
        config: GatewayConfig,
        nodes: &[&str],
        codec: Arc<dyn Codec>,
    ) -> (AppState, Arc<FakeTransport>) {
        let transport = Arc::new(FakeTransport::new());
        for address in nodes {
            transport.add_node(address, 0);
        }
        let state = AppState::from_parts(
            config,
            Arc::new(MemoryMetadataStore::new()),
            transport.clone(),
            codec,
        );
        for address in nodes {
            state.registry().register_node(address).await.unwrap();
        }
        (state, transport)
    }

    #[test]
    fn test_gateway_config_default() {
        let config = GatewayConfig::default();
        assert_eq!(config.block_size, DEFAULT_BLOCK_SIZE);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.download_concurrency, 1);
        assert!(config.validate().is_ok());
        assert!(matches!(config.metadata_backend(), MetadataBackend::Redis(_)));
        assert!(matches!(
            GatewayConfig::development().metadata_backend(),
            MetadataBackend::Memory
        ));
    }

    #[test]
    fn test_gateway_config_validation() {
        assert!(GatewayConfig::default().with_block_size(0).validate().is_err());
        assert!(GatewayConfig::default()
            .with_download_concurrency(0)
            .validate()
            .is_err());

        let config = GatewayConfig {
            listen_addr: "not-an-addr".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_file_name() {
        assert!(validate_file_name("report-2024.pdf").is_ok());
        assert!(validate_file_name("").is_err());
        assert!(validate_file_name("dir/file").is_err());
        assert!(validate_file_name("..").is_err());
        assert!(validate_file_name("bad\nname").is_err());
    }

    #[tokio::test]
    async fn test_upload_download_roundtrip_block_sizes() {
        let data = Bytes::from((0..4096u32).map(|i| (i % 253) as u8).collect::<Vec<_>>());

        // Sizes forcing many blocks, exact multiples, and a single block
        for block_size in [1, 64, 512, 1024, 4096, 10_000] {
            let config = GatewayConfig::development().with_block_size(block_size);
            let (state, _) =
                state_with(config, &["http://a", "http://b"], Arc::new(IdentityCodec)).await;

            let summary = state.upload("data.bin", data.clone()).await.unwrap();
            assert_eq!(summary.bytes, 4096);
            let expected_blocks = if 4096 < block_size { 1 } else { 4096 / block_size as u64 + 1 };
            assert_eq!(summary.blocks, expected_blocks);

            assert_eq!(state.download("data.bin").await.unwrap(), data);
        }
    }

    #[tokio::test]
    async fn test_upload_with_gzip() {
        let config = GatewayConfig::development().with_block_size(32);
        let (state, _) = state_with(config, &["http://a"], Arc::new(GzipCodec::default())).await;

        let data = Bytes::from(b"compress me ".repeat(200));
        state.upload("text.txt", data.clone()).await.unwrap();
        assert_eq!(state.download("text.txt").await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_upload_without_nodes() {
        let (state, _) =
            state_with(GatewayConfig::development(), &[], Arc::new(IdentityCodec)).await;

        let err = state
            .upload("a.txt", Bytes::from_static(b"hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, BlockyardError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_upload_rejects_bad_name() {
        let (state, _) =
            state_with(GatewayConfig::development(), &["http://a"], Arc::new(IdentityCodec)).await;
        let err = state
            .upload("../etc/passwd", Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, BlockyardError::Validation(_)));
    }

    #[tokio::test]
    async fn test_upload_survives_failing_node() {
        let config = GatewayConfig::development().with_block_size(16);
        let (state, transport) =
            state_with(config, &["http://a", "http://b"], Arc::new(IdentityCodec)).await;
        transport.reject_stores("http://a");

        let data = Bytes::from(vec![9u8; 100]);
        state.upload("f", data.clone()).await.unwrap();

        assert_eq!(state.registry().addresses(), vec!["http://b".to_string()]);
        assert_eq!(state.download("f").await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_download_unknown_file() {
        let (state, _) =
            state_with(GatewayConfig::development(), &["http://a"], Arc::new(IdentityCodec)).await;
        let err = state.download("nope").await.unwrap_err();
        assert!(matches!(err, BlockyardError::NotFound(_)));
    }
}
