//! Transaction pool error types.

use sc_02_ledger::RejectReason;
use shared_types::{Classify, ErrorClass, Hash};
use thiserror::Error;

/// Why `admit` refused a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Invalid against the current tip.
    #[error("rejected: {0}")]
    Rejected(#[from] RejectReason),

    /// Another pooled transaction already uses this sender sequence.
    #[error("sequence {sequence} already pooled as {}", hex::encode(.existing))]
    SequenceTaken { sequence: u64, existing: Hash },

    /// No room, and nothing with a strictly lower fee rate to evict.
    #[error("pool full: {size} bytes needed, {available} of {capacity} free")]
    PoolFull {
        size: usize,
        available: usize,
        capacity: usize,
    },
}

impl Classify for PoolError {
    fn class(&self) -> ErrorClass {
        match self {
            PoolError::Rejected(reason) => reason.class(),
            PoolError::SequenceTaken { .. } | PoolError::PoolFull { .. } => ErrorClass::Transient,
        }
    }
}
