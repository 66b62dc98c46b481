//! Storage error types.

use shared_types::{Classify, ErrorClass};
use thiserror::Error;

/// Key-value store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KVStoreError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {message}")]
    IOError { message: String },

    /// Stored bytes failed an integrity check.
    #[error("KV store corruption: {message}")]
    Corruption { message: String },

    /// Key not found.
    #[error("Key not found in KV store")]
    NotFound,
}

impl Classify for KVStoreError {
    fn class(&self) -> ErrorClass {
        ErrorClass::Resource
    }
}
