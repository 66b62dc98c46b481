//! # Node Runtime Library
//!
//! The StakeChain node core behind a single-writer chain manager. The main
//! entry point is the `main.rs` binary; the modules are exposed for the
//! integration suite.
//!
//! ## Modules
//!
//! - `container/` - configuration, chain manager, orphan pool
//! - `genesis/` - genesis block creation
//! - `handlers/` - bounded async intake
//! - `runtime` - startup, background tasks, shutdown

#![allow(clippy::type_complexity)]

pub mod container;
pub mod genesis;
pub mod handlers;
pub mod runtime;

pub use container::{BlockOutcome, ChainManager, NodeConfig, NodeError};
pub use genesis::{Genesis, GenesisBuilder, GenesisConfig};
pub use runtime::NodeRuntime;
