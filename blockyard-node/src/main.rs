//! Blockyard Storage Node Daemon
//!
//! Runs a storage node that:
//! - Stores blocks on local disk (or in memory for development)
//! - Serves block requests from the coordinator over HTTP
//! - Announces itself to the coordinator on startup
//! - Reports storage metrics via Prometheus endpoint

use blockyard_node::{init_metrics, router, NodeConfig, NodeMetrics, NodeState, Registrar};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "blockyard-node")]
#[command(about = "Blockyard storage node daemon")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "node.toml")]
    config: PathBuf,

    /// Storage directory (overrides config file)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// HTTP listen port (overrides config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Coordinator base URL (overrides config file)
    #[arg(long)]
    coordinator: Option<String>,

    /// Skip coordinator registration
    #[arg(long)]
    no_register: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(true)
        .init();

    // Priority: CLI args > environment > config file > defaults
    let mut config = NodeConfig::load_or_default(&cli.config)
        .with_env_overrides()
        .with_overrides(cli.data_dir, cli.port, cli.coordinator);
    if cli.no_register {
        config.coordinator.register = false;
    }
    config.validate()?;

    info!(
        node = %config.node.name,
        url = %config.public_url(),
        backend = %config.storage.backend,
        data_dir = ?config.storage.data_dir,
        capacity = config.storage.max_capacity_bytes,
        "Blockyard storage node starting"
    );

    let metrics_handle = if config.metrics.enabled {
        Some(init_metrics()?)
    } else {
        None
    };
    let node_metrics = NodeMetrics::new(config.node.name.clone());

    let store = config.storage.to_storage_config()?.open().await?;
    let state = Arc::new(
        NodeState::new(store)
            .with_metrics(node_metrics.clone())
            .with_max_block_bytes(config.network.max_block_bytes),
    );
    state.refresh_storage_metrics().await;

    let listen_addr = config.network.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    info!("HTTP server listening on {}", listen_addr);

    // Register once the listener is bound so the coordinator's first usage probe succeeds
    if config.coordinator.register {
        Registrar::from_config(&config, node_metrics)?.spawn();
    } else {
        info!("Coordinator registration disabled");
    }

    axum::serve(listener, router(state, metrics_handle))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Storage node shutdown complete");
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
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
