//! # State Layers
//!
//! Finalized state lives in one `BaseState`. Every validated, non-final block
//! owns a `StateLayer` holding only the accounts it changed. A view at block
//! `B` is the base plus the layers on the path from `B` down to the base.
//!
//! Layers are shared through `Arc`, so opening a view never copies accounts,
//! and disconnecting a block is just dropping its layer from the active path.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use shared_types::{Amount, Hash, Height, PublicKey};

use crate::domain::account::Account;

/// Finalized account state.
#[derive(Debug, Clone, Default)]
pub struct BaseState {
    /// Height of the last folded block.
    pub height: Height,
    /// Hash of the last folded block.
    pub hash: Hash,
    pub accounts: HashMap<PublicKey, Account>,
}

/// Account changes made by one validated block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateLayer {
    pub block_hash: Hash,
    pub parent_hash: Hash,
    pub height: Height,
    /// Post-block values of every touched account.
    pub changes: BTreeMap<PublicKey, Account>,
    /// Pre-block values of the same accounts. `None` if absent before.
    pub previous: BTreeMap<PublicKey, Option<Account>>,
}

/// Output of applying a whole block to a parent view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateDelta {
    pub block_hash: Hash,
    pub parent_hash: Hash,
    pub height: Height,
    pub changes: BTreeMap<PublicKey, Account>,
    pub previous: BTreeMap<PublicKey, Option<Account>>,
    /// Fees collected by the proposer.
    pub fees: Amount,
}

impl From<StateDelta> for StateLayer {
    fn from(delta: StateDelta) -> Self {
        Self {
            block_hash: delta.block_hash,
            parent_hash: delta.parent_hash,
            height: delta.height,
            changes: delta.changes,
            previous: delta.previous,
        }
    }
}

/// Persisted form of an active, non-final layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoRecord {
    pub block_hash: Hash,
    pub parent_hash: Hash,
    pub height: Height,
    pub changes: BTreeMap<PublicKey, Account>,
    pub previous: BTreeMap<PublicKey, Option<Account>>,
}

impl From<&StateLayer> for UndoRecord {
    fn from(layer: &StateLayer) -> Self {
        Self {
            block_hash: layer.block_hash,
            parent_hash: layer.parent_hash,
            height: layer.height,
            changes: layer.changes.clone(),
            previous: layer.previous.clone(),
        }
    }
}

impl From<UndoRecord> for StateLayer {
    fn from(record: UndoRecord) -> Self {
        Self {
            block_hash: record.block_hash,
            parent_hash: record.parent_hash,
            height: record.height,
            changes: record.changes,
            previous: record.previous,
        }
    }
}
