//! # Validation Context
//!
//! Everything a block's validation reads, captured up front. The context
//! owns a `StateView` and copies of the ancestor entries, so validation
//! runs without holding any lock on the chain index or the ledger.

use sc_02_ledger::{Ledger, StateDelta, StateView};
use sc_03_pos_rules::{DifficultySample, ProtocolParams};
use shared_types::{Block, BlockIndexEntry, ChainReader, CumulativeDifficulty, Difficulty, Hash, Height};

use crate::domain::errors::ValidationError;

/// Parent-side snapshot for validating one child block.
#[derive(Debug, Clone)]
pub struct BlockContext {
    /// Newest first, starting with the parent.
    ancestors: Vec<BlockIndexEntry>,
    parent_view: StateView,
}

impl BlockContext {
    /// Capture the context for a child of `parent_hash`.
    pub fn gather(
        chain: &dyn ChainReader,
        ledger: &Ledger,
        parent_hash: &Hash,
        params: &ProtocolParams,
    ) -> Result<Self, ValidationError> {
        if chain.entry(parent_hash).is_none() {
            return Err(ValidationError::UnknownParent(*parent_hash));
        }
        let depth = params
            .difficulty_window
            .max(params.block_size_window)
            .max(params.anchor_window as usize)
            .max(1);
        let ancestors = chain.ancestors(parent_hash, depth);
        let parent_view = ledger
            .open_at(parent_hash)
            .map_err(|_| ValidationError::StateUnavailable(*parent_hash))?;
        Self::new(ancestors, parent_view)
    }

    /// Context from parts. `ancestors` must start with the parent.
    pub fn new(ancestors: Vec<BlockIndexEntry>, parent_view: StateView) -> Result<Self, ValidationError> {
        match ancestors.first() {
            Some(parent) if parent.hash == parent_view.block_hash() => Ok(Self {
                ancestors,
                parent_view,
            }),
            Some(parent) => Err(ValidationError::StateUnavailable(parent.hash)),
            None => Err(ValidationError::UnknownParent(parent_view.block_hash())),
        }
    }

    pub fn parent(&self) -> &BlockIndexEntry {
        &self.ancestors[0]
    }

    pub fn parent_view(&self) -> &StateView {
        &self.parent_view
    }

    /// Height of the block being validated.
    pub fn height(&self) -> Height {
        self.parent().height + 1
    }

    /// Retarget window, oldest first.
    pub fn difficulty_samples(&self, window: usize) -> Vec<DifficultySample> {
        self.ancestors
            .iter()
            .take(window)
            .rev()
            .map(|e| DifficultySample {
                timestamp: e.timestamp,
                difficulty: e.difficulty,
            })
            .collect()
    }

    /// Recent block sizes, oldest first.
    pub fn recent_sizes(&self, window: usize) -> Vec<u64> {
        self.ancestors.iter().take(window).rev().map(|e| e.size).collect()
    }

    /// Whether `reference` is the parent or one of its `window - 1` nearest
    /// ancestors.
    pub fn is_anchor(&self, reference: &Hash, window: usize) -> bool {
        self.ancestors.iter().take(window).any(|e| e.hash == *reference)
    }
}

/// A block that passed every stage, with the state delta it produces.
#[derive(Debug, Clone)]
pub struct ValidatedBlock {
    pub block: Block,
    /// Index entry for the block. Its status is decided at commit.
    pub entry: BlockIndexEntry,
    pub delta: StateDelta,
}

impl ValidatedBlock {
    pub fn hash(&self) -> Hash {
        self.entry.hash
    }

    pub fn height(&self) -> Height {
        self.entry.height
    }

    pub fn difficulty(&self) -> Difficulty {
        self.entry.difficulty
    }

    pub fn cumulative_difficulty(&self) -> CumulativeDifficulty {
        self.entry.cumulative_difficulty
    }

    /// Hashes of the included transactions, in block order.
    pub fn transaction_hashes(&self) -> Vec<Hash> {
        self.block.transactions.iter().map(|tx| tx.hash()).collect()
    }
}
