//! # Shared Crypto - Signature and Hashing Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | SHA-256 | Content hashes, block/tx identifiers, PoS kernel |
//! | `signatures` | Ed25519 | Transaction and block-header signatures |
//!
//! ## Security Properties
//!
//! - **Ed25519**: Deterministic nonces, strict verification (rejects
//!   malleable encodings so a signature check has one outcome on every node)
//! - **SHA-256**: Canonical identifiers; the same bytes hash identically everywhere

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod signatures;

// Re-exports
pub use errors::CryptoError;
pub use hashing::{sha256, sha256_many, Sha256Hasher};
pub use signatures::{verify_signature, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
