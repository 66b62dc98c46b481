//! Ledger error types.

use sc_01_storage::KVStoreError;
use shared_types::{Amount, Classify, CodecError, ErrorClass, Hash, Height};
use thiserror::Error;

/// Why a transaction was rejected. Every variant is final for those bytes
/// against that state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("signature does not verify against sender key")]
    BadSignature,

    #[error("bad sequence: expected {expected}, got {got}")]
    BadSequence { expected: u64, got: u64 },

    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Amount, available: Amount },

    #[error("arithmetic overflow")]
    Overflow,

    #[error("stake immature until height {matures_at}")]
    StakeImmature { matures_at: Height },

    #[error("insufficient stake: staked {staked}, requested {requested}")]
    InsufficientStake { staked: Amount, requested: Amount },

    #[error("unknown contract")]
    UnknownContract,

    #[error("contract already exists")]
    ContractExists,

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("fee below floor: {fee} for {size} bytes")]
    FeeBelowFloor { fee: Amount, size: u64 },

    #[error("transaction too large: {size} > {max}")]
    Oversized { size: u64, max: u64 },

    #[error("reference block is not a recent ancestor")]
    BadAnchor,
}

impl Classify for RejectReason {
    fn class(&self) -> ErrorClass {
        ErrorClass::Permanent
    }
}

/// Ledger failures that are not a verdict on a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// No committed state at this height (pruned, or not reached yet).
    #[error("state unavailable at height {height}")]
    StateUnavailable { height: Height },

    /// No state layer for this block; its parent has not been committed.
    #[error("state unavailable for block {}", hex::encode(.0))]
    UnknownBlock(Hash),

    /// In-memory apply does not line up with the active chain.
    #[error("block {} does not attach to the ledger tip", hex::encode(.0))]
    NotOnTip(Hash),

    #[error("store error: {0}")]
    Store(#[from] KVStoreError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl Classify for LedgerError {
    fn class(&self) -> ErrorClass {
        match self {
            LedgerError::StateUnavailable { .. } | LedgerError::UnknownBlock(_) => {
                ErrorClass::Transient
            }
            LedgerError::NotOnTip(_) | LedgerError::Store(_) | LedgerError::Codec(_) => {
                ErrorClass::Resource
            }
        }
    }
}
