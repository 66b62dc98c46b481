//! Block validation errors.

use sc_02_ledger::RejectReason;
use shared_types::{Classify, ErrorClass, Hash};
use thiserror::Error;

use crate::domain::stage::ValidationStage;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Parent is not in the chain index yet.
    #[error("unknown parent {}", hex::encode(.0))]
    UnknownParent(Hash),

    /// Parent is indexed but its state is not available (pruned side branch
    /// or not yet registered).
    #[error("parent state unavailable for {}", hex::encode(.0))]
    StateUnavailable(Hash),

    #[error("genesis-shaped block cannot be validated")]
    UnexpectedGenesis,

    #[error("unsupported block version {0}")]
    UnsupportedVersion(u16),

    #[error("timestamp {timestamp} not after parent timestamp {parent}")]
    TimestampNotAfterParent { timestamp: u64, parent: u64 },

    #[error("timestamp {timestamp} more than {max_drift}s ahead of local clock {now}")]
    TimestampInFuture {
        timestamp: u64,
        now: u64,
        max_drift: u64,
    },

    #[error("content root does not match transactions")]
    ContentRootMismatch,

    #[error("proposer signature does not verify")]
    BadBlockSignature,

    #[error("proposer not eligible: stake weight {stake_weight}, difficulty {difficulty}")]
    NotEligible { stake_weight: u64, difficulty: u64 },

    #[error("block size {size} exceeds limit {max}")]
    BlockTooLarge { size: u64, max: u64 },

    #[error("transaction {index} ({}) rejected: {reason}", hex::encode(.tx_hash))]
    Transaction {
        index: usize,
        tx_hash: Hash,
        reason: RejectReason,
    },

    #[error("proposer credit overflows")]
    RewardOverflow,
}

impl ValidationError {
    /// Stage the validation was in when it failed.
    pub fn failed_at(&self) -> ValidationStage {
        match self {
            ValidationError::UnknownParent(_)
            | ValidationError::StateUnavailable(_)
            | ValidationError::UnexpectedGenesis
            | ValidationError::UnsupportedVersion(_)
            | ValidationError::TimestampNotAfterParent { .. }
            | ValidationError::TimestampInFuture { .. }
            | ValidationError::ContentRootMismatch
            | ValidationError::BadBlockSignature => ValidationStage::Received,
            ValidationError::NotEligible { .. } => ValidationStage::HeaderChecked,
            ValidationError::BlockTooLarge { .. }
            | ValidationError::Transaction { .. }
            | ValidationError::RewardOverflow => ValidationStage::EligibilityChecked,
        }
    }
}

impl Classify for ValidationError {
    fn class(&self) -> ErrorClass {
        match self {
            // A future timestamp becomes acceptable as the clock advances.
            ValidationError::UnknownParent(_)
            | ValidationError::StateUnavailable(_)
            | ValidationError::TimestampInFuture { .. } => ErrorClass::Transient,
            _ => ErrorClass::Permanent,
        }
    }
}
