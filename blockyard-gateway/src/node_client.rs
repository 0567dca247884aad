//! Storage Node Client
//!
//! Talks to storage nodes over their HTTP surface. The coordinator depends
//! on the [`NodeTransport`] trait so placement and assembly can be tested
//! without sockets.

use async_trait::async_trait;
use blockyard_core::{BlockyardError, Result};
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Configuration for the node client
#[derive(Debug, Clone)]
pub struct NodeClientConfig {
    /// Connection timeout
    pub connect_timeout: Duration,

    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for NodeClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// Remote operations the coordinator performs against a storage node
///
/// Every failure, including a non-2xx reply, is reported as
/// [`BlockyardError::Transport`].
#[async_trait]
pub trait NodeTransport: Send + Sync {
    /// Liveness probe
    async fn health(&self, node: &str) -> Result<()>;

    /// Bytes currently stored on the node
    async fn usage(&self, node: &str) -> Result<u64>;

    /// Store a block under `block_file`
    async fn store(&self, node: &str, block_file: &str, data: Bytes) -> Result<()>;

    /// Fetch a block stored under `block_file`
    async fn fetch(&self, node: &str, block_file: &str) -> Result<Bytes>;
}

#[derive(Debug, Deserialize)]
struct NodeSpace {
    #[serde(rename = "Size")]
    size: u64,
}

/// HTTP client for storage nodes, sharing one connection pool
#[derive(Clone)]
pub struct HttpNodeClient {
    client: reqwest::Client,
}

impl HttpNodeClient {
    /// Create a new node client
    pub fn new(config: NodeClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BlockyardError::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    fn url(node: &str, path: &str) -> String {
        format!("{}{}", node.trim_end_matches('/'), path)
    }

    /// Map transport errors and non-2xx replies onto `Transport`
    fn check(
        node: &str,
        response: reqwest::Result<reqwest::Response>,
    ) -> Result<reqwest::Response> {
        let response = response.map_err(|e| BlockyardError::transport(node, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(BlockyardError::transport(node, format!("HTTP {}", status)));
        }
        Ok(response)
    }
}

#[async_trait]
impl NodeTransport for HttpNodeClient {
    async fn health(&self, node: &str) -> Result<()> {
        let response = self.client.get(Self::url(node, "/health")).send().await;
        Self::check(node, response)?;
        Ok(())
    }

    async fn usage(&self, node: &str) -> Result<u64> {
        let response = self
            .client
            .get(Self::url(node, "/getCurrentNodeSpace"))
            .send()
            .await;
        let space: NodeSpace = Self::check(node, response)?
            .json()
            .await
            .map_err(|e| BlockyardError::transport(node, format!("bad usage reply: {}", e)))?;
        Ok(space.size)
    }

    async fn store(&self, node: &str, block_file: &str, data: Bytes) -> Result<()> {
        let len = data.len();
        let part = Part::stream_with_length(data, len as u64).file_name(block_file.to_string());
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(Self::url(node, "/receiveFile"))
            .multipart(form)
            .send()
            .await;
        Self::check(node, response)?;

        debug!(node = %node, block = %block_file, bytes = len, "Block stored");
        Ok(())
    }

    async fn fetch(&self, node: &str, block_file: &str) -> Result<Bytes> {
        let response = self
            .client
            .get(Self::url(node, "/retrieveFile"))
            .query(&[("filename", block_file)])
            .send()
            .await;
        let data = Self::check(node, response)?
            .bytes()
            .await
            .map_err(|e| BlockyardError::transport(node, e))?;

        debug!(node = %node, block = %block_file, bytes = data.len(), "Block fetched");
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_client_config_default() {
        let config = NodeClientConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        assert_eq!(
            HttpNodeClient::url("http://n1:8081/", "/health"),
            "http://n1:8081/health"
        );
        assert_eq!(
            HttpNodeClient::url("http://n1:8081", "/health"),
            "http://n1:8081/health"
        );
    }

    #[test]
    fn test_usage_reply_shape() {
        let space: NodeSpace = serde_json::from_str(r#"{"Size": 4096}"#).unwrap();
        assert_eq!(space.size, 4096);
    }

    #[tokio::test]
    async fn test_unreachable_node_is_transport_error() {
        let client = HttpNodeClient::new(NodeClientConfig {
            connect_timeout: Duration::from_millis(200),
            request_timeout: Duration::from_millis(500),
        })
        .unwrap();

        // Port 9 (discard) on loopback is closed in test environments.
        let err = client.health("http://127.0.0.1:9").await.unwrap_err();
        assert!(err.is_retryable());
    }
}
