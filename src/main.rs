// src/main.rs
//
// Boots a single Kademlia node: load config, set up logging, bind the
// listener, run until Ctrl+C, then shut down.

use anyhow::{Context, Result};
use tracing::info;

use kadnode::config_loader::load_config;
use kadnode::kademlia::service::Service;
use kadnode::logging;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config/node.yaml".to_string());
    let config = load_config(&config_path).with_context(|| format!("loading config from {config_path}"))?;

    logging::init_from_config(&config.debug.logging);

    let service = Service::new(&config).context("building node from config")?;
    info!(id = %service.local().id, remote = ?service.local().remote, "starting node");
    service.start().await.context("starting node")?;

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    info!("shutdown signal received");
    service.stop().await;

    Ok(())
}
