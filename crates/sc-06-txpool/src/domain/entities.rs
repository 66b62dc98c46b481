//! Pool entries, priority keys and configuration.

use std::cmp::Ordering;

use sc_03_pos_rules::FeeRate;
use serde::{Deserialize, Serialize};
use shared_types::{Hash, PublicKey, Transaction};

/// Pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TxPoolConfig {
    /// Total encoded bytes the pool may hold.
    pub max_bytes: usize,
}

impl Default for TxPoolConfig {
    fn default() -> Self {
        Self {
            max_bytes: 32 * 1024 * 1024,
        }
    }
}

/// A transaction held by the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PooledTx {
    pub tx: Transaction,
    pub hash: Hash,
    pub size: usize,
    pub rate: FeeRate,
}

impl PooledTx {
    pub fn new(tx: Transaction) -> Self {
        let hash = tx.hash();
        let size = tx.encoded_size();
        let rate = FeeRate::new(tx.fee(), size as u64);
        Self {
            tx,
            hash,
            size,
            rate,
        }
    }

    pub fn sender(&self) -> &PublicKey {
        self.tx.sender()
    }

    pub fn sequence(&self) -> u64 {
        self.tx.sequence()
    }

    pub fn key(&self) -> PriorityKey {
        PriorityKey {
            rate: self.rate,
            sequence: self.sequence(),
            hash: self.hash,
        }
    }
}

/// Eviction order: lowest fee rate first; among equal rates the highest
/// sequence goes first so a sender's later transactions leave before
/// earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityKey {
    pub rate: FeeRate,
    pub sequence: u64,
    pub hash: Hash,
}

impl Ord for PriorityKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rate
            .cmp(&other.rate)
            .then_with(|| other.sequence.cmp(&self.sequence))
            .then_with(|| self.hash.cmp(&other.hash))
    }
}

impl PartialOrd for PriorityKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Successful admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Added, possibly evicting lower fee-rate entries.
    Added { evicted: Vec<Hash> },
    /// Already pooled; nothing changed.
    AlreadyPooled,
}
