//! Node Usage Monitor
//!
//! Background task that periodically re-polls every registered node so the
//! registry's cached usage does not drift far from what nodes report.

use crate::state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Usage monitor configuration
#[derive(Debug, Clone)]
pub struct NodeMonitorConfig {
    /// How often to refresh usage
    pub check_interval: Duration,
}

impl Default for NodeMonitorConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(30),
        }
    }
}

/// Periodic usage refresher
pub struct NodeMonitor {
    config: NodeMonitorConfig,
}

impl NodeMonitor {
    pub fn new(config: NodeMonitorConfig) -> Self {
        Self { config }
    }

    /// Start the background loop; returns `None` when the interval is zero
    pub fn start(self, state: Arc<AppState>) -> Option<tokio::task::JoinHandle<()>> {
        let check_interval = self.config.check_interval;
        if check_interval.is_zero() {
            info!("Node usage monitor disabled");
            return None;
        }

        Some(tokio::spawn(async move {
            let mut timer = interval(check_interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs = check_interval.as_secs(), "Node usage monitor started");

            loop {
                timer.tick().await;
                run_check_cycle(&state).await;
            }
        }))
    }
}

async fn run_check_cycle(state: &AppState) {
    let registry = state.registry();
    if registry.addresses().is_empty() {
        debug!("No storage nodes registered, skipping usage refresh");
        return;
    }

    match registry.refresh_usage().await {
        Ok(nodes) => debug!(
            responding = nodes.len(),
            least_loaded = nodes.first().map(|n| n.address.as_str()).unwrap_or(""),
            "Usage refresh complete"
        ),
        Err(e) => warn!(error = %e, "Usage refresh failed"),
    }
}
