//! # Codec Boundary
//!
//! Canonical bytes for persistence. `bincode` with its default options is
//! fixed-width, little-endian and field-ordered, so equal values always
//! encode to equal bytes.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Encoding or decoding failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Value could not be encoded.
    #[error("Encode failed: {0}")]
    Encode(String),

    /// Bytes did not decode into the expected type.
    #[error("Decode failed: {0}")]
    Decode(String),
}

/// Encode a value to canonical bytes.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    bincode::serialize(value).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decode canonical bytes.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    bincode::deserialize(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}

/// Encoded length of a value. Values that cannot be encoded report
/// `usize::MAX` so every size limit rejects them.
pub fn encoded_len<T: Serialize>(value: &T) -> usize {
    bincode::serialized_size(value)
        .ok()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(usize::MAX)
}
