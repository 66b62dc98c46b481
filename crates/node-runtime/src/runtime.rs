//! # Node Runtime
//!
//! Owns the chain manager and the async tasks around it.
//!
//! ## Startup Sequence
//!
//! 1. Open the configured store
//! 2. Build the genesis block from configuration
//! 3. Open the chain manager (reload, or write genesis into an empty store)
//! 4. Start the intake loop, the event logger and the deferred-block retry
//!    timer
//!
//! Shutdown closes intake, waits for in-flight items, then stops the
//! background tasks.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sc_01_storage::{InMemoryKVStore, KeyValueStore};
use shared_bus::{ChainEvent, EventFilter};
use shared_types::short_hex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::container::{ChainManager, NodeConfig, StorageBackend, StorageConfig};
use crate::genesis::{Genesis, GenesisBuilder, GenesisConfig};
use crate::handlers::{spawn_intake, IntakeHandle};

pub struct NodeRuntime {
    manager: Arc<ChainManager>,
    intake: Option<IntakeHandle>,
    intake_task: JoinHandle<()>,
    logger_task: JoinHandle<()>,
    retry_task: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

impl NodeRuntime {
    /// Open the chain and start the intake loop. Must run inside a tokio
    /// runtime.
    pub fn start(config: NodeConfig) -> Result<Self> {
        let store = open_store(&config.storage)?;
        let genesis = build_genesis(&config.genesis)?;
        let manager = ChainManager::open(store, &config, &genesis)
            .context("Failed to open chain")?;
        Ok(Self::with_manager(Arc::new(manager), &config))
    }

    /// Start the tasks around an already opened manager.
    pub fn with_manager(manager: Arc<ChainManager>, config: &NodeConfig) -> Self {
        let (intake, intake_task) = spawn_intake(
            Arc::clone(&manager),
            config.runtime.intake_capacity,
            config.runtime.validation_workers,
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let logger_task = tokio::spawn(log_events(Arc::clone(&manager), shutdown_rx.clone()));
        let retry_task = tokio::spawn(retry_deferred(
            Arc::clone(&manager),
            Duration::from_secs(config.runtime.deferred_retry_secs.max(1)),
            shutdown_rx,
        ));

        let tip = manager.tip();
        info!(
            "[node] Running: tip {} at height {}, intake capacity {}",
            short_hex(&tip.hash),
            tip.height,
            config.runtime.intake_capacity
        );
        Self {
            manager,
            intake: Some(intake),
            intake_task,
            logger_task,
            retry_task,
            shutdown_tx,
        }
    }

    pub fn manager(&self) -> Arc<ChainManager> {
        Arc::clone(&self.manager)
    }

    /// Submit side of the intake queue. `None` after shutdown began.
    pub fn intake(&self) -> Option<IntakeHandle> {
        self.intake.clone()
    }

    /// Close intake, finish queued work and stop background tasks.
    pub async fn shutdown(mut self) {
        info!("[node] Shutting down");
        self.intake.take();
        if let Err(e) = (&mut self.intake_task).await {
            warn!("[node] Intake task ended abnormally: {}", e);
        }
        if self.shutdown_tx.send(true).is_err() {
            warn!("[node] Background tasks already stopped");
        }
        let _ = (&mut self.logger_task).await;
        let _ = (&mut self.retry_task).await;
        info!("[node] Shutdown complete");
    }
}

/// Open the store named by `config`.
pub fn open_store(config: &StorageConfig) -> Result<Box<dyn KeyValueStore>> {
    match config.backend {
        StorageBackend::Memory => {
            warn!("[node] In-memory store: chain state will not survive restart");
            Ok(Box::new(InMemoryKVStore::new()))
        }
        StorageBackend::RocksDb => open_rocksdb(config),
    }
}

#[cfg(feature = "rocksdb")]
fn open_rocksdb(config: &StorageConfig) -> Result<Box<dyn KeyValueStore>> {
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("Failed to create data dir {:?}", config.data_dir))?;
    let store = sc_01_storage::RocksDbStore::open_default(config.data_dir.join("chain"))
        .context("Failed to open RocksDB")?;
    Ok(Box::new(store))
}

#[cfg(not(feature = "rocksdb"))]
fn open_rocksdb(_config: &StorageConfig) -> Result<Box<dyn KeyValueStore>> {
    anyhow::bail!("storage backend \"rocksdb\" requires building with the `rocksdb` feature")
}

/// Build genesis, falling back to the development validator when no
/// allocations are configured.
pub fn build_genesis(config: &GenesisConfig) -> Result<Genesis> {
    let config = if config.allocations.is_empty() {
        let key = GenesisConfig::devnet_keypair();
        warn!(
            "[node] No genesis allocations configured, using devnet validator {}",
            hex::encode(key.public_key().as_bytes())
        );
        GenesisConfig {
            timestamp: config.timestamp,
            ..GenesisConfig::devnet(key.public_key().as_bytes())
        }
    } else {
        config.clone()
    };
    GenesisBuilder::new(config)
        .build()
        .context("Failed to build genesis block")
}

async fn retry_deferred(
    manager: Arc<ChainManager>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if manager.deferred_count() == 0 {
                    continue;
                }
                let manager = Arc::clone(&manager);
                match tokio::task::spawn_blocking(move || manager.retry_deferred()).await {
                    Ok(0) => {}
                    Ok(n) => info!("[node] {} deferred blocks connected", n),
                    Err(e) => warn!("[node] Deferred retry failed: {}", e),
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}

async fn log_events(manager: Arc<ChainManager>, mut shutdown: watch::Receiver<bool>) {
    let mut events = manager.subscribe(EventFilter::all());
    loop {
        tokio::select! {
            envelope = events.recv() => {
                let Some(envelope) = envelope else { break };
                match envelope.event {
                    ChainEvent::TipChanged { new, reorg_depth, .. } if reorg_depth > 0 => info!(
                        "[node] Reorg of depth {} to {} at height {}",
                        reorg_depth,
                        short_hex(&new.hash),
                        new.height
                    ),
                    ChainEvent::TipChanged { new, .. } => info!(
                        "[node] New tip {} at height {}",
                        short_hex(&new.hash),
                        new.height
                    ),
                    ChainEvent::TransactionsEvicted { hashes } => info!(
                        "[node] {} pooled transactions evicted",
                        hashes.len()
                    ),
                    ChainEvent::BlockConnected { .. } | ChainEvent::BlockDisconnected { .. } => {}
                }
            }
            _ = shutdown.changed() => break,
        }
    }
    manager.unsubscribe(events.id());
}
