//! Download Command
//!
//! Fetches a file from the coordinator and writes it locally.

use super::{format_bytes, spinner};
use crate::client::GatewayClient;
use crate::symbols;
use anyhow::{Context, Result};
use console::style;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Download configuration
pub struct DownloadConfig {
    pub name: String,
    pub output: Option<PathBuf>,
    pub default_dir: Option<PathBuf>,
}

/// Where the downloaded bytes should land
pub(crate) fn output_path(name: &str, output: Option<&Path>, default_dir: Option<&Path>) -> PathBuf {
    match output {
        Some(path) if path.is_dir() => path.join(name),
        Some(path) => path.to_path_buf(),
        None => default_dir.unwrap_or(Path::new(".")).join(name),
    }
}

/// Run download command
pub async fn run(client: &GatewayClient, config: DownloadConfig) -> Result<()> {
    let file_path = output_path(
        &config.name,
        config.output.as_deref(),
        config.default_dir.as_deref(),
    );

    let pb = spinner(format!("Downloading {}", config.name));
    let result = client.retrieve_file(&config.name).await;
    pb.finish_and_clear();
    let data = result.with_context(|| format!("Failed to download {}", config.name))?;

    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(&file_path, &data)
        .await
        .with_context(|| format!("Failed to write {}", file_path.display()))?;

    println!(
        "{} {} {} -> {}",
        style(symbols::CHECK).green(),
        style("Downloaded").green().bold(),
        config.name,
        file_path.display()
    );
    println!("  Size: {}", format_bytes(data.len() as u64));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path() {
        let dir = tempfile::TempDir::new().unwrap();

        assert_eq!(output_path("a.txt", None, None), PathBuf::from("./a.txt"));
        assert_eq!(
            output_path("a.txt", None, Some(Path::new("/data"))),
            PathBuf::from("/data/a.txt")
        );
        assert_eq!(
            output_path("a.txt", Some(dir.path()), None),
            dir.path().join("a.txt")
        );
        assert_eq!(
            output_path("a.txt", Some(Path::new("/tmp/renamed.txt")), None),
            PathBuf::from("/tmp/renamed.txt")
        );
    }
}
