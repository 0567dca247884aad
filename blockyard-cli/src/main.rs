//! Blockyard CLI
//!
//! Command-line client for the Blockyard coordinator.
//!
//! # Commands
//! - `upload` - Upload a file
//! - `download` - Download a file
//! - `nodes` - Show storage node usage
//! - `add-node` - Register a storage node
//! - `status` - Show coordinator status
//! - `config` - Show or edit configuration
//!
//! # Configuration
//! Config file: ~/.blockyard/config.toml

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;

mod client;
mod commands;
mod config;
mod symbols;

use client::GatewayClient;
use commands::{download, nodes, status, upload};

#[derive(Parser)]
#[command(name = "blockyard")]
#[command(about = "Blockyard distributed block storage CLI")]
#[command(version)]
struct Cli {
    /// Coordinator URL (overrides config file)
    #[arg(long, global = true, env = "BLOCKYARD_GATEWAY")]
    gateway: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file
    Upload {
        /// Path to the local file
        path: String,

        /// Name to store the file under (defaults to the local file name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Download a file
    Download {
        /// Stored file name
        name: String,

        /// Output file or directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show storage node usage
    Nodes,

    /// Register a storage node with the coordinator
    AddNode {
        /// Node base URL, e.g. http://10.0.0.7:8081
        url: String,
    },

    /// Show coordinator status
    Status,

    /// Show or initialize configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Show config file path
    Path,

    /// Initialize config file with defaults
    Init {
        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (gateway.url, gateway.timeout_secs, cli.download_dir)
        key: String,
        /// Value to set
        value: String,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {:#}", style(symbols::CROSS).red(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    // CLI args override config file
    let cfg = config::load_config();
    let gateway_url = cli.gateway.unwrap_or_else(|| cfg.gateway.url.clone());
    tracing::debug!(gateway = %gateway_url, "Using coordinator");

    let client = GatewayClient::new(&gateway_url, cfg.gateway.timeout())?;

    match cli.command {
        Commands::Upload { path, name } => {
            upload::run(&client, upload::UploadConfig { path, name }).await?;
        }

        Commands::Download { name, output } => {
            let config = download::DownloadConfig {
                name,
                output,
                default_dir: cfg.cli.download_dir.clone(),
            };
            download::run(&client, config).await?;
        }

        Commands::Nodes => nodes::list(&client).await?,

        Commands::AddNode { url } => nodes::add(&client, &url).await?,

        Commands::Status => status::run(&client).await?,

        Commands::Config { command } => handle_config_command(command, &cfg)?,
    }

    Ok(())
}

/// Handle config subcommands
fn handle_config_command(command: Option<ConfigCommands>, cfg: &config::BlockyardConfig) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("{}", style("Blockyard Configuration").bold().underlined());
            println!();
            println!("{}", style("[gateway]").cyan());
            println!("  url = \"{}\"", cfg.gateway.url);
            println!("  timeout_secs = {}", cfg.gateway.timeout_secs);
            if let Some(dir) = &cfg.cli.download_dir {
                println!();
                println!("{}", style("[cli]").cyan());
                println!("  download_dir = \"{}\"", dir.display());
            }
            println!();

            let path = config::config_file_path()?;
            println!("{} {}", style("Config file:").dim(), path.display());
            if !path.exists() {
                println!(
                    "{} Run '{}' to create it",
                    style("(not created yet)").yellow(),
                    style("blockyard config init").green()
                );
            }
        }

        Some(ConfigCommands::Path) => {
            println!("{}", config::config_file_path()?.display());
        }

        Some(ConfigCommands::Init { force }) => {
            let path = config::config_file_path()?;
            if path.exists() && !force {
                println!(
                    "{} Config file already exists at {}",
                    style(symbols::WARN).yellow(),
                    path.display()
                );
                println!("Use --force to overwrite");
                return Ok(());
            }

            let path = config::save_config(&config::BlockyardConfig::default())?;
            println!(
                "{} Config file created at {}",
                style(symbols::CHECK).green(),
                path.display()
            );
        }

        Some(ConfigCommands::Set { key, value }) => {
            let mut updated = cfg.clone();
            updated.set(&key, value)?;
            config::save_config(&updated)?;
            println!("{} Configuration updated", style(symbols::CHECK).green());
        }
    }

    Ok(())
}
