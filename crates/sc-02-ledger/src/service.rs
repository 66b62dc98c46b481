//! # Ledger Service
//!
//! Owns the finalized base, every non-final state layer and the active path
//! through them.
//!
//! ## Commit Protocol
//!
//! 1. `insert_validated` registers the layer produced by block validation.
//! 2. `plan_commit` turns a disconnect/connect path into store operations
//!    without touching memory.
//! 3. The caller writes those operations in one atomic batch.
//! 4. `apply_commit` swaps the in-memory active path only after the write
//!    succeeded.
//!
//! A failed write leaves memory untouched, so the whole commit can be
//! retried from scratch.
//!
//! ## Persisted Layout
//!
//! | Key | Value |
//! |-----|-------|
//! | `a:{pubkey}` | latest active `Account` |
//! | `u:{height}` | `UndoRecord` for each non-final active block |

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use sc_01_storage::{BatchOperation, KeyPrefix, KeyValueStore};
use sc_03_pos_rules::ProtocolParams;
use shared_types::{decode, encode, short_hex, ChainTip, Hash, Height, PublicKey};
use tracing::{debug, info};

use crate::domain::account::Account;
use crate::domain::errors::LedgerError;
use crate::domain::layers::{BaseState, StateDelta, StateLayer, UndoRecord};
use crate::domain::view::StateView;

/// In-memory changes a planned commit will make once its batch is durable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerCommit {
    /// Tip-first.
    pub disconnect: Vec<Hash>,
    /// Ascending height.
    pub connect: Vec<Hash>,
    /// New finalized height, if it moves.
    pub finalize_to: Option<Height>,
    pub ops: Vec<BatchOperation>,
}

/// Account state across the finalized base and all non-final blocks.
pub struct Ledger {
    params: ProtocolParams,
    base: Arc<BaseState>,
    layers: HashMap<Hash, Arc<StateLayer>>,
    /// Active path above the base, ascending height.
    active: Vec<Hash>,
}

impl Ledger {
    /// Ledger whose base is the genesis state.
    pub fn from_genesis(
        params: ProtocolParams,
        genesis_hash: Hash,
        allocations: BTreeMap<PublicKey, Account>,
    ) -> Self {
        let base = BaseState {
            height: 0,
            hash: genesis_hash,
            accounts: allocations.into_iter().collect(),
        };
        Self {
            params,
            base: Arc::new(base),
            layers: HashMap::new(),
            active: Vec::new(),
        }
    }

    /// Store operations that persist the genesis state.
    pub fn genesis_ops(&self) -> Result<Vec<BatchOperation>, LedgerError> {
        let mut keys: Vec<_> = self.base.accounts.keys().collect();
        keys.sort();
        keys.into_iter()
            .map(|key| -> Result<BatchOperation, LedgerError> {
                let account = &self.base.accounts[key];
                Ok(BatchOperation::put(
                    KeyPrefix::account_key(key),
                    encode(account)?,
                ))
            })
            .collect()
    }

    /// Rebuild from the store. `tip` is the chain index's active tip.
    ///
    /// Latest accounts are read from `a:` keys; undo records are peeled off
    /// from the top to recover the finalized base and the non-final layers.
    pub fn load<S: KeyValueStore + ?Sized>(
        store: &S,
        params: ProtocolParams,
        tip: ChainTip,
    ) -> Result<Self, LedgerError> {
        let mut accounts = HashMap::new();
        for (key, value) in store.prefix_scan(KeyPrefix::Account.as_bytes())? {
            let Some(suffix) = KeyPrefix::Account.suffix(&key) else {
                continue;
            };
            let Ok(pubkey) = PublicKey::try_from(suffix) else {
                continue;
            };
            accounts.insert(pubkey, decode::<Account>(&value)?);
        }

        let mut records = Vec::new();
        for (_, value) in store.prefix_scan(KeyPrefix::Undo.as_bytes())? {
            records.push(decode::<UndoRecord>(&value)?);
        }
        records.sort_by_key(|r| r.height);

        for record in records.iter().rev() {
            for (key, previous) in &record.previous {
                match previous {
                    Some(account) => accounts.insert(*key, account.clone()),
                    None => accounts.remove(key),
                };
            }
        }

        let (base_height, base_hash) = match records.first() {
            Some(first) => (first.height - 1, first.parent_hash),
            None => (tip.height, tip.hash),
        };

        let mut ledger = Self {
            params,
            base: Arc::new(BaseState {
                height: base_height,
                hash: base_hash,
                accounts,
            }),
            layers: HashMap::new(),
            active: Vec::new(),
        };
        for record in records {
            let layer: StateLayer = record.into();
            ledger.active.push(layer.block_hash);
            ledger.layers.insert(layer.block_hash, Arc::new(layer));
        }

        info!(
            "[sc-02] Ledger loaded: finalized height {}, {} non-final layers, tip {}",
            ledger.base.height,
            ledger.active.len(),
            short_hex(&ledger.tip_hash())
        );
        Ok(ledger)
    }

    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    /// Height of the finalized base.
    pub fn finalized_height(&self) -> Height {
        self.base.height
    }

    /// Height of the active tip.
    pub fn tip_height(&self) -> Height {
        self.base.height + self.active.len() as Height
    }

    /// Hash of the active tip.
    pub fn tip_hash(&self) -> Hash {
        self.active.last().copied().unwrap_or(self.base.hash)
    }

    /// Whether a layer exists for `hash` (or it is the base).
    pub fn has_state(&self, hash: &Hash) -> bool {
        *hash == self.base.hash || self.layers.contains_key(hash)
    }

    /// Snapshot of the active chain at `height`.
    pub fn open(&self, height: Height) -> Result<StateView, LedgerError> {
        if height < self.base.height || height > self.tip_height() {
            return Err(LedgerError::StateUnavailable { height });
        }
        if height == self.base.height {
            return Ok(StateView::new(Arc::clone(&self.base), Vec::new()));
        }
        let index = (height - self.base.height - 1) as usize;
        self.open_at(&self.active[index])
    }

    /// Snapshot of the active tip.
    pub fn open_tip(&self) -> StateView {
        let layers = self
            .active
            .iter()
            .rev()
            .filter_map(|h| self.layers.get(h).cloned())
            .collect();
        StateView::new(Arc::clone(&self.base), layers)
    }

    /// Snapshot after block `hash`, active or not.
    pub fn open_at(&self, hash: &Hash) -> Result<StateView, LedgerError> {
        let mut layers = Vec::new();
        let mut cursor = *hash;
        while cursor != self.base.hash {
            let layer = self
                .layers
                .get(&cursor)
                .ok_or(LedgerError::UnknownBlock(*hash))?;
            if layer.height <= self.base.height {
                return Err(LedgerError::UnknownBlock(*hash));
            }
            cursor = layer.parent_hash;
            layers.push(Arc::clone(layer));
        }
        Ok(StateView::new(Arc::clone(&self.base), layers))
    }

    /// Register the layer of a validated block. Idempotent.
    pub fn insert_validated(&mut self, delta: StateDelta) {
        let hash = delta.block_hash;
        if self.layers.contains_key(&hash) {
            return;
        }
        debug!(
            "[sc-02] Layer registered: block {} height {} ({} accounts)",
            short_hex(&hash),
            delta.height,
            delta.changes.len()
        );
        self.layers.insert(hash, Arc::new(delta.into()));
    }

    /// Drop a layer that was registered but will never be committed.
    pub fn discard(&mut self, hash: &Hash) {
        if !self.active.contains(hash) {
            self.layers.remove(hash);
        }
    }

    /// Store operations for disconnecting `disconnect` (tip first) and then
    /// connecting `connect` (ascending).
    pub fn plan_commit(&self, disconnect: &[Hash], connect: &[Hash]) -> Result<LedgerCommit, LedgerError> {
        let mut ops = Vec::new();
        let mut expected_tip = self.tip_hash();
        let mut height = self.tip_height();

        for hash in disconnect {
            if *hash != expected_tip || height <= self.base.height {
                return Err(LedgerError::NotOnTip(*hash));
            }
            let layer = self.layer(hash)?;
            for (key, previous) in &layer.previous {
                ops.push(match previous {
                    Some(account) => {
                        BatchOperation::put(KeyPrefix::account_key(key), encode(account)?)
                    }
                    None => BatchOperation::delete(KeyPrefix::account_key(key)),
                });
            }
            ops.push(BatchOperation::delete(KeyPrefix::undo_key(layer.height)));
            expected_tip = layer.parent_hash;
            height -= 1;
        }

        for hash in connect {
            let layer = self.layer(hash)?;
            if layer.parent_hash != expected_tip || layer.height != height + 1 {
                return Err(LedgerError::NotOnTip(*hash));
            }
            for (key, account) in &layer.changes {
                ops.push(if account.is_empty() {
                    BatchOperation::delete(KeyPrefix::account_key(key))
                } else {
                    BatchOperation::put(KeyPrefix::account_key(key), encode(account)?)
                });
            }
            let record = UndoRecord::from(layer.as_ref());
            ops.push(BatchOperation::put(
                KeyPrefix::undo_key(layer.height),
                encode(&record)?,
            ));
            expected_tip = *hash;
            height += 1;
        }

        let finalize_to = height
            .checked_sub(self.params.rollback_limit)
            .filter(|h| *h > self.base.height);
        if let Some(target) = finalize_to {
            for h in self.base.height + 1..=target {
                ops.push(BatchOperation::delete(KeyPrefix::undo_key(h)));
            }
        }

        Ok(LedgerCommit {
            disconnect: disconnect.to_vec(),
            connect: connect.to_vec(),
            finalize_to,
            ops,
        })
    }

    /// Swap the in-memory active path. Call only after the batch from
    /// `plan_commit` has been written.
    pub fn apply_commit(&mut self, commit: &LedgerCommit) -> Result<(), LedgerError> {
        for hash in &commit.disconnect {
            if self.active.last() != Some(hash) {
                return Err(LedgerError::NotOnTip(*hash));
            }
            self.active.pop();
        }
        for hash in &commit.connect {
            if !self.layers.contains_key(hash) {
                return Err(LedgerError::UnknownBlock(*hash));
            }
            self.active.push(*hash);
        }
        if let Some(target) = commit.finalize_to {
            self.finalize(target);
        }
        Ok(())
    }

    /// Plan, write and apply in one call. Single-subsystem convenience over
    /// `plan_commit` + `apply_commit`.
    pub fn commit<S: KeyValueStore + ?Sized>(
        &mut self,
        store: &mut S,
        disconnect: &[Hash],
        connect: &[Hash],
    ) -> Result<(), LedgerError> {
        let plan = self.plan_commit(disconnect, connect)?;
        store.atomic_batch_write(plan.ops.clone())?;
        self.apply_commit(&plan)
    }

    fn layer(&self, hash: &Hash) -> Result<&Arc<StateLayer>, LedgerError> {
        self.layers.get(hash).ok_or(LedgerError::UnknownBlock(*hash))
    }

    /// Fold active layers up to `target` into the base and drop side layers
    /// that can no longer reach it.
    fn finalize(&mut self, target: Height) {
        let count = (target.saturating_sub(self.base.height) as usize).min(self.active.len());
        if count == 0 {
            return;
        }
        let folded: Vec<Hash> = self.active.drain(..count).collect();
        let base = Arc::make_mut(&mut self.base);
        for hash in &folded {
            if let Some(layer) = self.layers.remove(hash) {
                for (key, account) in &layer.changes {
                    if account.is_empty() {
                        base.accounts.remove(key);
                    } else {
                        base.accounts.insert(*key, account.clone());
                    }
                }
                base.height = layer.height;
                base.hash = layer.block_hash;
            }
        }

        let before = self.layers.len();
        let reachable: Vec<Hash> = self
            .layers
            .keys()
            .copied()
            .filter(|h| self.reaches_base(h))
            .collect();
        self.layers.retain(|h, _| reachable.contains(h));

        info!(
            "[sc-02] Finalized through height {} ({} side layers pruned)",
            self.base.height,
            before - self.layers.len()
        );
    }

    fn reaches_base(&self, hash: &Hash) -> bool {
        let mut cursor = *hash;
        loop {
            if cursor == self.base.hash {
                return true;
            }
            match self.layers.get(&cursor) {
                Some(layer) if layer.height > self.base.height => cursor = layer.parent_hash,
                _ => return false,
            }
        }
    }
}
