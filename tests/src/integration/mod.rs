//! # Integration Suites
//!
//! Each suite drives `ChainManager` end to end: validator, chain index,
//! ledger and pool over one store.

pub mod determinism;
pub mod fork_choice;
pub mod restart;
pub mod txpool;
