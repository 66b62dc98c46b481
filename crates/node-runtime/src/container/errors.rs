//! Chain manager errors.

use sc_01_storage::KVStoreError;
use sc_02_ledger::LedgerError;
use sc_04_block_validator::ValidationError;
use sc_05_chain_index::ChainError;
use sc_06_txpool::PoolError;
use shared_types::{Classify, ErrorClass, Hash};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("chain index: {0}")]
    Chain(#[from] ChainError),

    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("store: {0}")]
    Store(#[from] KVStoreError),

    #[error("transaction pool: {0}")]
    Pool(#[from] PoolError),

    /// A commit failed to become durable; writes stay refused until restart.
    #[error("write path halted after a store failure")]
    WritePathHalted,

    /// The store holds a chain built on a different genesis block.
    #[error("stored genesis {} does not match configured genesis {}", hex::encode(.stored), hex::encode(.configured))]
    GenesisMismatch { stored: Hash, configured: Hash },
}

impl Classify for NodeError {
    fn class(&self) -> ErrorClass {
        match self {
            NodeError::Validation(e) => e.class(),
            NodeError::Chain(e) => e.class(),
            NodeError::Ledger(e) => e.class(),
            NodeError::Pool(e) => e.class(),
            NodeError::Store(_) | NodeError::WritePathHalted | NodeError::GenesisMismatch { .. } => {
                ErrorClass::Resource
            }
        }
    }
}
