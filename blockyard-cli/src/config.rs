//! CLI configuration
//!
//! Config directory: ~/.blockyard/ (cross-platform)
//!
//! Config file format (~/.blockyard/config.toml):
//! ```toml
//! [gateway]
//! url = "http://localhost:8080"
//! timeout_secs = 300
//!
//! [cli]
//! download_dir = "/home/me/Downloads"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Structure of ~/.blockyard/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BlockyardConfig {
    /// Coordinator connection
    #[serde(default)]
    pub gateway: GatewaySettings,

    /// CLI-specific settings
    #[serde(default)]
    pub cli: CliSettings,
}

/// Coordinator connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    /// Coordinator HTTP URL
    #[serde(default = "default_gateway_url")]
    pub url: String,

    /// Request timeout for uploads and downloads
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            url: default_gateway_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GatewaySettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_gateway_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

/// CLI-specific settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CliSettings {
    /// Where `download` writes files when no output is given
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
}

impl BlockyardConfig {
    /// Set a value by dotted key
    pub fn set(&mut self, key: &str, value: String) -> Result<()> {
        match key {
            "gateway.url" => self.gateway.url = value,
            "gateway.timeout_secs" => {
                self.gateway.timeout_secs = value
                    .parse()
                    .with_context(|| format!("{} is not a number of seconds", value))?
            }
            "cli.download_dir" => self.cli.download_dir = Some(PathBuf::from(value)),
            _ => anyhow::bail!(
                "Unknown config key: {}. Valid keys: gateway.url, gateway.timeout_secs, cli.download_dir",
                key
            ),
        }
        Ok(())
    }
}

/// Get the config directory path (~/.blockyard/)
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".blockyard"))
}

/// Get the config file path
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load configuration, falling back to defaults if the file is missing or invalid
pub fn load_config() -> BlockyardConfig {
    match config_file_path() {
        Ok(path) if path.exists() => load_from(&path).unwrap_or_else(|e| {
            eprintln!("Warning: {:#}", e);
            BlockyardConfig::default()
        }),
        _ => BlockyardConfig::default(),
    }
}

fn load_from(path: &Path) -> Result<BlockyardConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&content).context("Failed to parse config file")
}

/// Save configuration to ~/.blockyard/config.toml
pub fn save_config(config: &BlockyardConfig) -> Result<PathBuf> {
    let path = config_file_path()?;
    save_to(config, &path)?;
    Ok(path)
}

fn save_to(config: &BlockyardConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(path, content).context("Failed to write config file")?;
    Ok(())
}
