// src/main.rs

//! Lightlink node binary entry point.

use anyhow::Context;
use lightlink_client::DevNodeFactory;
use lightlink_node::config::SETTINGS_ENV;
use lightlink_node::{Bridge, RpcServer, Settings};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Lightlink Node Bridge");
    tracing::info!("Version: {}", lightlink_node::NODE_VERSION);

    // Settings path from the first argument or the environment
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(SETTINGS_ENV).map(PathBuf::from));
    let settings = Settings::load(path.as_deref()).context("failed to load settings")?;

    let factory = match settings.dev.head_interval_secs {
        Some(secs) => DevNodeFactory::with_head_interval(Duration::from_secs(secs)),
        None => DevNodeFactory::new(),
    };
    let bridge = Arc::new(Bridge::from_settings(&settings, Arc::new(factory))?);

    if settings.rpc.enabled {
        let server = RpcServer::new(settings.rpc.listen_addr, bridge.clone());
        tokio::select! {
            result = server.start() => result.context("RPC server failed")?,
            _ = tokio::signal::ctrl_c() => tracing::info!("Received shutdown signal"),
        }
    } else {
        tracing::warn!("RPC disabled; waiting for shutdown signal");
        tokio::signal::ctrl_c().await?;
    }

    if let Err(e) = bridge.stop().await {
        tracing::warn!("Node did not stop cleanly: {}", e);
    }

    Ok(())
}
