//! # StakeChain Node Runtime
//!
//! Binary entry point.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging (`RUST_LOG`, default `info`)
//! 2. Load configuration (defaults, `SC_CONFIG` file, `SC_*` variables)
//! 3. Open the chain and start intake
//! 4. Run until Ctrl+C, then shut down gracefully

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use node_runtime::{NodeConfig, NodeRuntime};

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("===========================================");
    info!("  StakeChain Node Runtime v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let config = NodeConfig::from_env().context("Failed to load configuration")?;
    info!(
        "Storage: {:?} at {:?}, rollback limit {}, maturity {}",
        config.storage.backend,
        config.storage.data_dir,
        config.chain.rollback_limit,
        config.chain.maturity
    );

    let runtime = NodeRuntime::start(config)?;

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    Ok(())
}
