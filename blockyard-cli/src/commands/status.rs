//! Status Command
//!
//! Shows coordinator health and a node summary.

use super::format_bytes;
use crate::client::GatewayClient;
use crate::symbols;
use anyhow::Result;
use console::style;

/// Run status command
pub async fn run(client: &GatewayClient) -> Result<()> {
    let healthy = client.health().await.unwrap_or(false);

    println!("{}", style("Blockyard Status").bold().underlined());
    println!();
    println!("Coordinator: {}", client.base_url());

    if healthy {
        println!("Status:      {} {}", style(symbols::DOT).green(), style("Online").green());
    } else {
        println!("Status:      {} {}", style(symbols::DOT).red(), style("Offline").red());
        return Ok(());
    }

    match client.nodes_usage().await {
        Ok(nodes) => {
            let total: u64 = nodes.iter().map(|n| n.usage).sum();
            println!("Nodes:       {}", style(nodes.len()).cyan());
            println!("Stored:      {}", style(format_bytes(total)).cyan());
        }
        Err(e) => {
            println!(
                "Nodes:       {} {}",
                style(symbols::WARN).yellow(),
                style(e).yellow()
            );
        }
    }

    Ok(())
}
