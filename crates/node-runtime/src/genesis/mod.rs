//! # Genesis Module
//!
//! Genesis block creation and chain initialization.
//!
//! The genesis block has special properties:
//!
//! - Height: 0
//! - Parent hash: 32 zero bytes
//! - No transactions, no proposer signature
//! - Allocations seed the ledger base directly; genesis stake is mature
//!
//! ## Initialization Sequence
//!
//! 1. Build the genesis block from configuration
//! 2. Seed the chain index and the ledger base from it
//! 3. Write both in one batch
//!
//! A store that already holds a chain is reloaded instead, and its block at
//! height 0 must match the configured genesis.

pub mod builder;

pub use builder::{Genesis, GenesisAllocation, GenesisBuilder, GenesisConfig, GenesisError};
