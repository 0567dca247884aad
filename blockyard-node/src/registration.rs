//! Coordinator registration
//!
//! On startup the node announces its public URL with `POST {coordinator}/addNode`,
//! retrying with a fixed delay. A node that cannot register keeps serving; an
//! operator can add it later through the coordinator's API.

use crate::config::NodeConfig;
use crate::metrics::NodeMetrics;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("coordinator replied {status}: {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<RegistrationError>,
    },
}

#[derive(Serialize)]
struct AddNodeRequest<'a> {
    #[serde(rename = "Url")]
    url: &'a str,
}

/// Announces this node to the coordinator
pub struct Registrar {
    client: reqwest::Client,
    coordinator_url: String,
    public_url: String,
    retries: u32,
    retry_delay: Duration,
    metrics: NodeMetrics,
}

impl Registrar {
    pub fn new(
        coordinator_url: impl Into<String>,
        public_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, RegistrationError> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            coordinator_url: coordinator_url.into().trim_end_matches('/').to_string(),
            public_url: public_url.into(),
            retries: 5,
            retry_delay: Duration::from_secs(2),
            metrics: NodeMetrics::new("blockyard-node"),
        })
    }

    pub fn from_config(config: &NodeConfig, metrics: NodeMetrics) -> Result<Self, RegistrationError> {
        Ok(Self::new(
            &config.coordinator.url,
            config.public_url(),
            config.coordinator.request_timeout(),
        )?
        .with_retries(config.coordinator.retries, config.coordinator.retry_delay())
        .with_metrics(metrics))
    }

    pub fn with_retries(mut self, retries: u32, delay: Duration) -> Self {
        self.retries = retries.max(1);
        self.retry_delay = delay;
        self
    }

    pub fn with_metrics(mut self, metrics: NodeMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Register, retrying up to the configured number of attempts
    pub async fn register(&self) -> Result<(), RegistrationError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_register().await {
                Ok(()) => {
                    self.metrics.record_registration(true);
                    info!(
                        coordinator = %self.coordinator_url,
                        url = %self.public_url,
                        attempt,
                        "Registered with coordinator"
                    );
                    return Ok(());
                }
                Err(e) => {
                    self.metrics.record_registration(false);
                    if attempt >= self.retries {
                        return Err(RegistrationError::Exhausted {
                            attempts: attempt,
                            last: Box::new(e),
                        });
                    }
                    warn!(
                        coordinator = %self.coordinator_url,
                        attempt,
                        retries = self.retries,
                        error = %e,
                        "Registration failed, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }

    async fn try_register(&self) -> Result<(), RegistrationError> {
        let endpoint = format!("{}/addNode", self.coordinator_url);
        debug!(endpoint = %endpoint, "Sending addNode");

        let response = self
            .client
            .post(&endpoint)
            .json(&AddNodeRequest {
                url: &self.public_url,
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(RegistrationError::Rejected { status, body })
    }

    /// Register in the background; failures are logged only
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.register().await {
                warn!(
                    coordinator = %self.coordinator_url,
                    error = %e,
                    "Could not register with coordinator; serving anyway"
                );
            }
        })
    }
}
