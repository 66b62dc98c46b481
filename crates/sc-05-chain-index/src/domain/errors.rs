use sc_01_storage::KVStoreError;
use shared_types::{Classify, CodecError, ErrorClass, Hash};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// Parent is not in the index yet.
    #[error("unknown parent {}", hex::encode(.0))]
    UnknownParent(Hash),

    /// Switching would disconnect a finalized block.
    #[error("reorg too deep: depth {depth} exceeds rollback limit {limit}")]
    ReorgTooDeep { depth: u64, limit: u64 },

    /// Height or cumulative difficulty does not follow the parent.
    #[error("block {} does not extend its parent monotonically", hex::encode(.0))]
    NotMonotonic(Hash),

    /// Stored index is inconsistent with itself.
    #[error("chain index corrupt: {0}")]
    Corrupt(String),

    #[error("store error: {0}")]
    Store(#[from] KVStoreError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl Classify for ChainError {
    fn class(&self) -> ErrorClass {
        match self {
            ChainError::UnknownParent(_) | ChainError::ReorgTooDeep { .. } => ErrorClass::Transient,
            ChainError::NotMonotonic(_) => ErrorClass::Permanent,
            ChainError::Corrupt(_) | ChainError::Store(_) | ChainError::Codec(_) => {
                ErrorClass::Resource
            }
        }
    }
}
