//! # Chain Index Types
//!
//! The block index entry and the read-only port other subsystems use to look
//! at the chain without owning it.

use serde::{Deserialize, Serialize};

use crate::entities::{CumulativeDifficulty, Difficulty, Hash, Height, PublicKey};

/// Whether a known block sits on the active chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockStatus {
    /// On the best chain.
    Active,
    /// Known and valid, but not on the best chain.
    Disconnected,
}

/// Index record for one validated block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockIndexEntry {
    /// Block id.
    pub hash: Hash,
    /// Distance from genesis.
    pub height: Height,
    /// Parent cumulative difficulty + `difficulty`.
    pub cumulative_difficulty: CumulativeDifficulty,
    /// Difficulty this block was produced at.
    pub difficulty: Difficulty,
    /// Parent block id.
    pub parent_hash: Hash,
    /// Header timestamp.
    pub timestamp: u64,
    /// Encoded block size in bytes.
    pub size: u64,
    /// Block proposer.
    pub proposer: PublicKey,
    /// Active or disconnected.
    pub status: BlockStatus,
}

impl BlockIndexEntry {
    /// Whether the entry is on the active chain.
    pub fn is_active(&self) -> bool {
        self.status == BlockStatus::Active
    }
}

/// The active tip as seen by readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTip {
    /// Tip block id.
    pub hash: Hash,
    /// Tip height.
    pub height: Height,
    /// Tip cumulative difficulty.
    pub cumulative_difficulty: CumulativeDifficulty,
}

/// Read-only view of the block index.
pub trait ChainReader: Send + Sync {
    /// Index entry by block hash.
    fn entry(&self, hash: &Hash) -> Option<BlockIndexEntry>;

    /// Current active tip.
    fn active_tip(&self) -> ChainTip;

    /// Active block hash at `height`.
    fn active_hash_at(&self, height: Height) -> Option<Hash>;

    /// Up to `count` entries walking back from `from` (inclusive), newest first.
    fn ancestors(&self, from: &Hash, count: usize) -> Vec<BlockIndexEntry> {
        let mut out = Vec::with_capacity(count);
        let mut cursor = self.entry(from);
        while let Some(entry) = cursor {
            if out.len() == count {
                break;
            }
            let parent = entry.parent_hash;
            let is_genesis = entry.height == 0;
            out.push(entry);
            if is_genesis {
                break;
            }
            cursor = self.entry(&parent);
        }
        out
    }

    /// Whether `candidate` is `from` or one of its `window - 1` nearest ancestors.
    fn is_recent_ancestor(&self, from: &Hash, candidate: &Hash, window: usize) -> bool {
        let Some(target) = self.entry(candidate) else {
            return false;
        };
        let Some(start) = self.entry(from) else {
            return false;
        };
        if target.height > start.height || start.height - target.height >= window as u64 {
            return false;
        }
        if target.is_active() && start.is_active() {
            return self.active_hash_at(target.height) == Some(*candidate);
        }
        self.ancestors(from, window)
            .iter()
            .any(|entry| entry.hash == *candidate)
    }
}
