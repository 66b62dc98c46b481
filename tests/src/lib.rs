//! # StakeChain Test Suite
//!
//! Cross-crate tests driving the full node core through `ChainManager`.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs        # keys, genesis, block and transaction builders
//! └── integration/
//!     ├── determinism.rs # same history, same state
//!     ├── fork_choice.rs # reorgs, ties, rollback bound
//!     ├── txpool.rs      # pool consistency, replay, fee floor
//!     └── restart.rs     # reload from the store
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p sc-tests
//! cargo test -p sc-tests --features rocksdb   # adds on-disk restart tests
//! cargo bench -p sc-tests
//! ```

pub mod fixtures;
pub mod integration;
