//! # State Views
//!
//! A `StateView` is an immutable snapshot bound to one block. It holds `Arc`
//! handles to the base and to the layers on its path, so it stays valid
//! while the ledger commits, rolls back or finalizes underneath it.

use std::collections::BTreeMap;
use std::sync::Arc;

use sc_03_pos_rules::ProtocolParams;
use shared_crypto::Sha256Hasher;
use shared_types::{Amount, Hash, Height, PublicKey};

use crate::domain::account::Account;
use crate::domain::layers::{BaseState, StateLayer};
use crate::domain::pending::PendingState;

/// Read-only account state at a specific block.
#[derive(Debug, Clone)]
pub struct StateView {
    base: Arc<BaseState>,
    /// Newest first.
    layers: Vec<Arc<StateLayer>>,
    block_hash: Hash,
    height: Height,
}

impl StateView {
    pub(crate) fn new(base: Arc<BaseState>, layers: Vec<Arc<StateLayer>>) -> Self {
        let (block_hash, height) = match layers.first() {
            Some(top) => (top.block_hash, top.height),
            None => (base.hash, base.height),
        };
        Self {
            base,
            layers,
            block_hash,
            height,
        }
    }

    /// Block this view is bound to.
    pub fn block_hash(&self) -> Hash {
        self.block_hash
    }

    /// Height of that block.
    pub fn height(&self) -> Height {
        self.height
    }

    /// Account record, if the key has ever been touched.
    pub fn get(&self, key: &PublicKey) -> Option<&Account> {
        for layer in &self.layers {
            if let Some(account) = layer.changes.get(key) {
                return Some(account);
            }
        }
        self.base.accounts.get(key)
    }

    /// Account record, or an empty one.
    pub fn account(&self, key: &PublicKey) -> Account {
        self.get(key).cloned().unwrap_or_default()
    }

    /// Spendable balance at `height`.
    pub fn spendable(&self, key: &PublicKey, height: Height) -> Amount {
        self.get(key)
            .and_then(|a| a.spendable(height))
            .unwrap_or(0)
    }

    /// Matured stake of `key` counted for a block at `height`.
    pub fn stake_weight(&self, key: &PublicKey, height: Height) -> Amount {
        self.get(key).map_or(0, |a| a.matured_stake(height))
    }

    /// Next valid sequence for `key`.
    pub fn next_sequence(&self, key: &PublicKey) -> u64 {
        self.get(key).map_or(1, |a| a.sequence + 1)
    }

    /// Start a pending delta set for the block at `height() + 1`.
    pub fn begin(&self, params: &ProtocolParams) -> PendingState {
        PendingState::new(self.clone(), params.clone())
    }

    /// Every non-empty account, ordered by key.
    pub fn accounts(&self) -> BTreeMap<PublicKey, Account> {
        let mut merged: BTreeMap<PublicKey, Account> = self
            .base
            .accounts
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect();
        for layer in self.layers.iter().rev() {
            for (key, account) in &layer.changes {
                merged.insert(*key, account.clone());
            }
        }
        merged.retain(|_, a| !a.is_empty());
        merged
    }

    /// SHA-256 over every account in key order. Two nodes with the same
    /// history produce the same digest.
    pub fn digest(&self) -> Hash {
        let mut hasher = Sha256Hasher::new();
        for (key, account) in self.accounts() {
            hasher.update(&key);
            feed_account(&mut hasher, &account);
        }
        hasher.finalize()
    }
}

/// Every account field, fixed-width big-endian, in declaration order.
fn feed_account(hasher: &mut Sha256Hasher, account: &Account) {
    hasher
        .update(&account.balance.to_be_bytes())
        .update(&account.stake.to_be_bytes())
        .update(&account.sequence.to_be_bytes())
        .update(&account.stake_matures_at.to_be_bytes())
        .update(&(account.locked.len() as u64).to_be_bytes());
    for lock in &account.locked {
        hasher
            .update(&lock.amount.to_be_bytes())
            .update(&lock.unlock_height.to_be_bytes());
    }
    match &account.code_hash {
        Some(code_hash) => hasher.update(&[1]).update(code_hash),
        None => hasher.update(&[0]),
    };
}
