//! # Shared Types Crate
//!
//! Domain entities and the codec boundary shared by every StakeChain
//! subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Transactions, blocks and block index entries
//!   are defined once, here.
//! - **Canonical identity**: A transaction or header hash is a SHA-256 digest
//!   over a fixed field order. The same logical object always hashes the same.
//! - **Sum-typed payloads**: `TxPayload` is a closed enum, so every consumer
//!   matches all payload kinds exhaustively.

pub mod chain;
pub mod codec;
pub mod entities;
pub mod errors;

pub use chain::*;
pub use codec::{decode, encode, CodecError};
pub use entities::*;
pub use errors::*;

/// Short hex prefix of a hash, for log fields.
pub fn short_hex(hash: &Hash) -> String {
    hex::encode(&hash[..6])
}
