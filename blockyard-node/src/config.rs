//! Configuration management for the Blockyard storage node
//!
//! Supports loading from TOML files, command-line overrides and environment
//! variables.

use blockyard_storage::{BackendKind, StorageConfig};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Complete node configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node identity
    #[serde(default)]
    pub node: NodeIdentity,

    /// Block storage
    #[serde(default)]
    pub storage: StorageSettings,

    /// HTTP listener
    #[serde(default)]
    pub network: NetworkSettings,

    /// Coordinator registration
    #[serde(default)]
    pub coordinator: CoordinatorSettings,

    /// Prometheus endpoint
    #[serde(default)]
    pub metrics: MetricsSettings,
}

impl NodeConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: NodeConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load config, using defaults");
                Self::default()
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.port == 0 {
            return Err(ConfigError::ValidationError(
                "network.port must be non-zero".into(),
            ));
        }

        self.network.listen_addr()?;

        if self.network.max_block_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "network.max_block_bytes must be non-zero".into(),
            ));
        }

        self.storage.backend_kind()?;

        check_http_url("node.public_url", &self.public_url())?;

        if self.coordinator.register {
            check_http_url("coordinator.url", &self.coordinator.url)?;
            if self.coordinator.retries == 0 {
                return Err(ConfigError::ValidationError(
                    "coordinator.retries must be at least 1".into(),
                ));
            }
        }

        Ok(())
    }

    /// Override values from command line arguments
    pub fn with_overrides(
        mut self,
        data_dir: Option<PathBuf>,
        port: Option<u16>,
        coordinator_url: Option<String>,
    ) -> Self {
        if let Some(dir) = data_dir {
            self.storage.data_dir = dir;
        }
        if let Some(port) = port {
            self.network.port = port;
        }
        if let Some(url) = coordinator_url {
            self.coordinator.url = url;
        }
        self
    }

    /// Override values from `BLOCKYARD_*` environment variables
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("BLOCKYARD_NODE_PUBLIC_URL") {
            self.node.public_url = Some(url);
        }
        if let Some(dir) = lookup("BLOCKYARD_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup("BLOCKYARD_COORDINATOR_URL") {
            self.coordinator.url = url;
        }
        if let Some(port) = lookup("BLOCKYARD_NODE_PORT").and_then(|p| p.parse().ok()) {
            self.network.port = port;
        }
        self
    }

    /// URL the coordinator should use to reach this node
    ///
    /// Falls back to the listen address, with an unspecified bind address
    /// replaced by loopback.
    pub fn public_url(&self) -> String {
        if let Some(url) = &self.node.public_url {
            return url.trim_end_matches('/').to_string();
        }
        let host = match self.network.bind_address.as_str() {
            "0.0.0.0" | "::" | "[::]" => "127.0.0.1",
            other => other,
        };
        format!("http://{}:{}", host, self.network.port)
    }
}

fn check_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = reqwest::Url::parse(value)
        .map_err(|e| ConfigError::ValidationError(format!("{} {:?}: {}", field, value, e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::ValidationError(format!(
            "{} must be an http(s) URL with a host, got {:?}",
            field, value
        )));
    }
    Ok(())
}

/// Node identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeIdentity {
    /// Human-readable name used in logs
    #[serde(default = "default_node_name")]
    pub name: String,

    /// Base URL announced to the coordinator (defaults to the listen address)
    #[serde(default)]
    pub public_url: Option<String>,
}

impl Default for NodeIdentity {
    fn default() -> Self {
        Self {
            name: default_node_name(),
            public_url: None,
        }
    }
}

fn default_node_name() -> String {
    "blockyard-node".to_string()
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// `disk` or `memory`
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Block directory for the disk backend
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Capacity in bytes (0 = unlimited)
    #[serde(default)]
    pub max_capacity_bytes: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            data_dir: default_data_dir(),
            max_capacity_bytes: 0,
        }
    }
}

impl StorageSettings {
    pub fn backend_kind(&self) -> Result<BackendKind, ConfigError> {
        self.backend.parse().map_err(ConfigError::ValidationError)
    }

    /// Convert to storage crate config
    pub fn to_storage_config(&self) -> Result<StorageConfig, ConfigError> {
        Ok(StorageConfig::new(&self.data_dir)
            .with_max_capacity(self.max_capacity_bytes)
            .with_backend(self.backend_kind()?))
    }
}

fn default_backend() -> String {
    "disk".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./blockyard_data")
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Bind address
    #[serde(default = "default_bind_addr")]
    pub bind_address: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted `/receiveFile` body in bytes
    #[serde(default = "default_max_block_bytes")]
    pub max_block_bytes: usize,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_addr(),
            port: default_port(),
            max_block_bytes: default_max_block_bytes(),
        }
    }
}

impl NetworkSettings {
    /// Get the HTTP listen address
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let host = self.bind_address.trim_start_matches('[').trim_end_matches(']');
        let ip: std::net::IpAddr = host.parse().map_err(|e| {
            ConfigError::ValidationError(format!(
                "network.bind_address {:?}: {}",
                self.bind_address, e
            ))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

fn default_max_block_bytes() -> usize {
    // A full block plus multipart framing
    2 * blockyard_core::DEFAULT_BLOCK_SIZE
}

/// Coordinator registration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorSettings {
    /// Coordinator base URL
    #[serde(default = "default_coordinator_url")]
    pub url: String,

    /// Announce this node on startup
    #[serde(default = "default_true")]
    pub register: bool,

    /// Registration attempts before giving up
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Fixed delay between attempts
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    /// Per-request timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            url: default_coordinator_url(),
            register: true,
            retries: default_retries(),
            retry_delay_secs: default_retry_delay(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl CoordinatorSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_coordinator_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_retries() -> u32 {
    5
}

fn default_retry_delay() -> u64 {
    2
}

fn default_request_timeout() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSettings {
    /// Serve `/metrics` on the node's HTTP port
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}
