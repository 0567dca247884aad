//! Blockyard coordinator
//!
//! Provides:
//! - File upload/download over HTTP, split into blocks across storage nodes
//! - Node registration and usage reporting
//! - Prometheus metrics

use blockyard_gateway::metrics;
use blockyard_gateway::node_monitor::{NodeMonitor, NodeMonitorConfig};
use blockyard_gateway::{cors_layer, router, AppState, GatewayConfig};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "blockyard-gateway")]
#[command(about = "Blockyard storage coordinator")]
struct Cli {
    /// HTTP listen address
    #[arg(long, env = "BLOCKYARD_LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    listen_addr: String,

    /// Redis URL for file and block metadata
    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379")]
    redis_url: String,

    /// Keep metadata in memory instead of Redis (development only)
    #[arg(long, env = "BLOCKYARD_MEMORY_METADATA", default_value = "false")]
    memory_metadata: bool,

    /// Maximum block size in bytes
    #[arg(long, env = "BLOCKYARD_BLOCK_SIZE", default_value_t = blockyard_core::DEFAULT_BLOCK_SIZE)]
    block_size: usize,

    /// Nominal node size in bytes; nodes above twice this are full
    #[arg(long, env = "BLOCKYARD_MAX_NODE_SIZE", default_value_t = blockyard_core::DEFAULT_MAX_NODE_SIZE)]
    max_node_size: u64,

    /// Timeout for each storage node request, in seconds
    #[arg(long, env = "BLOCKYARD_REQUEST_TIMEOUT_SECS", default_value = "5")]
    request_timeout_secs: u64,

    /// Blocks fetched ahead during download (1 = sequential)
    #[arg(long, env = "BLOCKYARD_DOWNLOAD_CONCURRENCY", default_value = "1")]
    download_concurrency: usize,

    /// Seconds between background usage refreshes (0 disables)
    #[arg(long, env = "BLOCKYARD_MONITOR_INTERVAL_SECS", default_value = "30")]
    monitor_interval_secs: u64,

    /// Largest accepted upload in bytes
    #[arg(long, env = "BLOCKYARD_MAX_UPLOAD_BYTES", default_value = "1073741824")]
    max_upload_bytes: usize,

    /// Gzip level (0-9)
    #[arg(long, env = "BLOCKYARD_COMPRESSION_LEVEL", default_value = "6")]
    compression_level: u32,

    /// Disable the /metrics endpoint
    #[arg(long, default_value = "false")]
    no_metrics: bool,

    /// Enable CORS for all origins (development only)
    #[arg(long, default_value = "false")]
    cors_permissive: bool,

    /// Origins allowed to make cross-origin requests (comma-separated)
    #[arg(long = "cors-origin", env = "BLOCKYARD_CORS_ORIGINS", value_delimiter = ',')]
    cors_origins: Vec<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            listen_addr: self.listen_addr.clone(),
            redis_url: self.redis_url.clone(),
            use_memory_metadata: self.memory_metadata,
            block_size: self.block_size,
            max_node_size: self.max_node_size,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            download_concurrency: self.download_concurrency,
            monitor_interval: Duration::from_secs(self.monitor_interval_secs),
            max_upload_bytes: self.max_upload_bytes,
            compression_level: self.compression_level,
            enable_metrics: !self.no_metrics,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(true)
        .init();

    let config = cli.gateway_config();
    config.validate()?;

    info!(
        http = %config.listen_addr,
        memory_metadata = config.use_memory_metadata,
        block_size = config.block_size,
        max_node_size = config.max_node_size,
        "Starting Blockyard coordinator"
    );
    if config.use_memory_metadata {
        warn!("Metadata is kept in memory; uploaded files are lost on restart");
    }

    let metrics_handle = if config.enable_metrics {
        Some(metrics::init_metrics()?)
    } else {
        None
    };

    // Create shared application state
    let state = Arc::new(AppState::with_config(config.clone()).await?);

    // Start background usage monitor
    let monitor = NodeMonitor::new(NodeMonitorConfig {
        check_interval: config.monitor_interval,
    });
    let _monitor_handle = monitor.start(state.clone());

    let cors = cors_layer(cli.cors_permissive, &cli.cors_origins)?;
    if cli.cors_permissive {
        warn!("CORS is open to all origins");
    }

    let app = router(state, metrics_handle).layer(cors);

    let http_addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    info!("HTTP server listening on {}", http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Coordinator shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
