//! Node Commands
//!
//! Lists storage node usage and registers new nodes.

use super::format_bytes;
use crate::client::GatewayClient;
use crate::symbols;
use anyhow::{Context, Result};
use console::style;

/// Print usage per node, least loaded first
pub async fn list(client: &GatewayClient) -> Result<()> {
    let nodes = client
        .nodes_usage()
        .await
        .context("Failed to fetch node usage")?;

    println!("{}", style("Storage Nodes").bold().underlined());
    println!();

    if nodes.is_empty() {
        println!("{}", style("No nodes responded").yellow());
        return Ok(());
    }

    let width = nodes.iter().map(|n| n.address.len()).max().unwrap_or(0);
    for node in &nodes {
        println!(
            "  {:<width$}  {}",
            node.address,
            style(format_bytes(node.usage)).cyan(),
            width = width
        );
    }

    let total: u64 = nodes.iter().map(|n| n.usage).sum();
    println!();
    println!(
        "  {} nodes, {} stored",
        style(nodes.len()).green(),
        format_bytes(total)
    );
    Ok(())
}

/// Register a node with the coordinator
pub async fn add(client: &GatewayClient, url: &str) -> Result<()> {
    let reply = client
        .add_node(url)
        .await
        .with_context(|| format!("Failed to add node {}", url))?;

    println!(
        "{} Node {} registered ({} total)",
        style(symbols::CHECK).green(),
        reply.url,
        reply.nodes
    );
    Ok(())
}
