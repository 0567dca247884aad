//! Gateway Client
//!
//! HTTP client for the Blockyard coordinator API.

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} ({kind}) - {message}")]
    Api {
        status: u16,
        kind: String,
        message: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Reply to a successful upload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub file_name: String,
    pub blocks: u64,
    pub bytes: u64,
}

/// One entry of `/nodesUsage`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeUsage {
    pub address: String,
    pub usage: u64,
}

/// Reply to `/addNode`
#[derive(Debug, Clone, Deserialize)]
pub struct AddNodeReply {
    #[serde(rename = "Url")]
    pub url: String,
    pub nodes: usize,
}

#[derive(Debug, Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    kind: String,
}

/// Gateway client
pub struct GatewayClient {
    client: Client,
    base_url: String,
}

impl GatewayClient {
    /// Create a new gateway client
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turn a non-2xx reply into an error, keeping the server's kind
    async fn check(response: Response, subject: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(subject.to_string()));
        }

        let text = response.text().await.unwrap_or_default();
        let body: ErrorBody = serde_json::from_str(&text).unwrap_or_else(|_| ErrorBody {
            error: text,
            kind: String::new(),
        });
        Err(ClientError::Api {
            status: status.as_u16(),
            kind: if body.kind.is_empty() {
                "unknown".to_string()
            } else {
                body.kind
            },
            message: body.error,
        })
    }

    /// Check gateway health
    pub async fn health(&self) -> Result<bool> {
        let response = self.client.get(self.url("/health")).send().await?;
        Ok(response.status().is_success())
    }

    /// Upload `data` under `file_name`
    pub async fn send_file(&self, file_name: &str, data: Bytes) -> Result<UploadSummary> {
        let len = data.len() as u64;
        let part = Part::stream_with_length(data, len).file_name(file_name.to_string());
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.url("/sendFile"))
            .multipart(form)
            .send()
            .await?;
        Ok(Self::check(response, file_name).await?.json().await?)
    }

    /// Download a file by name
    pub async fn retrieve_file(&self, file_name: &str) -> Result<Bytes> {
        let response = self
            .client
            .get(self.url("/retrieveFile"))
            .query(&[("fileName", file_name)])
            .send()
            .await?;
        Ok(Self::check(response, file_name).await?.bytes().await?)
    }

    /// Usage per node, ascending
    pub async fn nodes_usage(&self) -> Result<Vec<NodeUsage>> {
        let response = self.client.get(self.url("/nodesUsage")).send().await?;
        let entries: Vec<BTreeMap<String, u64>> =
            Self::check(response, "nodes").await?.json().await?;

        Ok(entries
            .into_iter()
            .flat_map(|entry| entry.into_iter())
            .map(|(address, usage)| NodeUsage { address, usage })
            .collect())
    }

    /// Register a storage node
    pub async fn add_node(&self, node_url: &str) -> Result<AddNodeReply> {
        let response = self
            .client
            .post(self.url("/addNode"))
            .json(&serde_json::json!({ "Url": node_url }))
            .send()
            .await?;
        Ok(Self::check(response, node_url).await?.json().await?)
    }
}
