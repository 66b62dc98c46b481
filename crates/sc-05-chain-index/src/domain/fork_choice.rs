//! # Fork Choice
//!
//! Heaviest cumulative difficulty wins; ties keep the current tip.

use shared_types::Hash;

/// What committing a candidate block does to the active chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForkChoice {
    /// Candidate's parent is the tip.
    Extend,
    /// Candidate sits on a heavier branch.
    Reorg {
        /// Active blocks to drop, tip first.
        disconnect: Vec<Hash>,
        /// Branch blocks to activate, ascending, ending with the candidate.
        connect: Vec<Hash>,
    },
    /// Candidate is valid but not heavier than the tip.
    StoredAsSide,
    /// Candidate is already indexed.
    AlreadyKnown,
}

impl ForkChoice {
    /// Whether the active tip changes.
    pub fn moves_tip(&self) -> bool {
        matches!(self, ForkChoice::Extend | ForkChoice::Reorg { .. })
    }

    /// Blocks leaving the active chain, tip first.
    pub fn disconnect(&self) -> &[Hash] {
        match self {
            ForkChoice::Reorg { disconnect, .. } => disconnect,
            _ => &[],
        }
    }

    /// Blocks joining the active chain, ascending.
    pub fn connect(&self, candidate: &Hash) -> Vec<Hash> {
        match self {
            ForkChoice::Extend => vec![*candidate],
            ForkChoice::Reorg { connect, .. } => connect.clone(),
            ForkChoice::StoredAsSide | ForkChoice::AlreadyKnown => Vec::new(),
        }
    }

    /// Number of blocks disconnected.
    pub fn depth(&self) -> u64 {
        self.disconnect().len() as u64
    }
}
