//! # Chain Container
//!
//! The chain manager and everything it is built from: configuration,
//! errors, and the orphan pool.
//!
//! ## Ownership
//!
//! - The manager owns the store, chain index, ledger, pool and validator
//! - Shared across tasks as `Arc<ChainManager>`
//! - Every mutation goes through the manager's single commit section

pub mod config;
pub mod errors;
pub mod manager;
pub mod orphans;

pub use config::{ConfigError, NodeConfig, RuntimeConfig, StorageBackend, StorageConfig};
pub use errors::NodeError;
pub use manager::{BlockOutcome, ChainManager};
pub use orphans::OrphanPool;
