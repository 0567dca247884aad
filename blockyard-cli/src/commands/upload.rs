//! Upload Command
//!
//! Sends one local file to the coordinator.

use super::{format_bytes, spinner};
use crate::client::GatewayClient;
use crate::symbols;
use anyhow::{Context, Result};
use bytes::Bytes;
use console::style;
use std::path::Path;
use tokio::fs;

/// Upload configuration
pub struct UploadConfig {
    pub path: String,
    /// Stored name; defaults to the local file name
    pub name: Option<String>,
}

/// Run upload command
pub async fn run(client: &GatewayClient, config: UploadConfig) -> Result<()> {
    let path = Path::new(&config.path);
    if !path.is_file() {
        anyhow::bail!("Not a file: {}", config.path);
    }

    let file_name = match config.name {
        Some(name) => name,
        None => path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .context("File name is not valid UTF-8; pass --name")?,
    };

    let data = fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let size = data.len() as u64;

    let pb = spinner(format!("Uploading {} ({})", file_name, format_bytes(size)));
    let result = client.send_file(&file_name, Bytes::from(data)).await;
    pb.finish_and_clear();

    let summary = result.context("Upload failed")?;
    println!(
        "{} {} {}",
        style(symbols::CHECK).green(),
        style("Uploaded").green().bold(),
        summary.file_name
    );
    println!("  Size:   {}", format_bytes(summary.bytes));
    println!("  Blocks: {}", summary.blocks);

    Ok(())
}
