//! # Key Schema
//!
//! All keys are prefixed to namespace different data types. Heights are
//! big-endian so a prefix scan returns them in height order.

use shared_types::{Hash, Height, PublicKey};

/// Key prefixes for the key-value store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPrefix {
    /// Block data: `b:{hash}` -> CRC-framed Block
    Block,
    /// Header: `x:{hash}` -> BlockHeader
    Header,
    /// Index entry: `e:{hash}` -> BlockIndexEntry
    IndexEntry,
    /// Active chain: `h:{height}` -> Hash
    BlockByHeight,
    /// Latest account state: `a:{pubkey}` -> Account
    Account,
    /// Undo record of an active block: `u:{height}` -> UndoRecord
    Undo,
    /// Chain metadata: `m:{name}`
    Metadata,
}

impl KeyPrefix {
    /// Get the byte prefix for this key type.
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            KeyPrefix::Block => b"b:",
            KeyPrefix::Header => b"x:",
            KeyPrefix::IndexEntry => b"e:",
            KeyPrefix::BlockByHeight => b"h:",
            KeyPrefix::Account => b"a:",
            KeyPrefix::Undo => b"u:",
            KeyPrefix::Metadata => b"m:",
        }
    }

    /// Build a full key with the given suffix.
    pub fn key(&self, suffix: &[u8]) -> Vec<u8> {
        let mut key = self.as_bytes().to_vec();
        key.extend_from_slice(suffix);
        key
    }

    /// Build a block key from a hash.
    pub fn block_key(hash: &Hash) -> Vec<u8> {
        KeyPrefix::Block.key(hash)
    }

    /// Build a header key from a hash.
    pub fn header_key(hash: &Hash) -> Vec<u8> {
        KeyPrefix::Header.key(hash)
    }

    /// Build an index entry key from a hash.
    pub fn entry_key(hash: &Hash) -> Vec<u8> {
        KeyPrefix::IndexEntry.key(hash)
    }

    /// Build a height key from a block height.
    pub fn height_key(height: Height) -> Vec<u8> {
        KeyPrefix::BlockByHeight.key(&height.to_be_bytes())
    }

    /// Build an account key.
    pub fn account_key(key: &PublicKey) -> Vec<u8> {
        KeyPrefix::Account.key(key)
    }

    /// Build an undo key from a block height.
    pub fn undo_key(height: Height) -> Vec<u8> {
        KeyPrefix::Undo.key(&height.to_be_bytes())
    }

    /// Build a metadata key.
    pub fn metadata_key(name: &str) -> Vec<u8> {
        KeyPrefix::Metadata.key(name.as_bytes())
    }

    /// Strip this prefix from a scanned key.
    pub fn suffix<'a>(&self, key: &'a [u8]) -> Option<&'a [u8]> {
        key.strip_prefix(self.as_bytes())
    }
}
