//! # Chain Index Service
//!
//! In-memory index of every validated block plus the active chain, with
//! store operations for each change. Like the ledger, a commit is planned
//! first (`prepare_commit`), written by the caller in one batch, then
//! applied (`apply_commit`). Readers of the index only ever see the state
//! before or after a commit.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use sc_01_storage::{frame, unframe, BatchOperation, KeyPrefix, KeyValueStore};
use sc_03_pos_rules::ProtocolParams;
use shared_bus::{ChainEvent, ChainEventBus, EventFilter, EventPublisher, Subscription, SubscriptionId};
use shared_types::{
    decode, encode, short_hex, Block, BlockIndexEntry, BlockStatus, ChainReader, ChainTip, Hash,
    Height,
};
use tracing::{debug, info, warn};

use crate::domain::errors::ChainError;
use crate::domain::fork_choice::ForkChoice;

const TIP_KEY: &str = "tip";

/// A planned commit: the fork choice for one candidate and the store
/// operations that make it durable.
#[derive(Debug, Clone)]
pub struct ChainCommit {
    /// Candidate entry, with the status it will have after the commit.
    pub entry: BlockIndexEntry,
    pub choice: ForkChoice,
    pub old_tip: ChainTip,
    pub new_tip: ChainTip,
    /// Side entries that can no longer join the active chain once the new
    /// tip is in place, with their records deleted by `ops`.
    pub pruned: Vec<Hash>,
    pub ops: Vec<BatchOperation>,
}

/// Block index and best-chain tracker.
pub struct ChainIndex {
    params: ProtocolParams,
    entries: HashMap<Hash, BlockIndexEntry>,
    /// Active chain, indexed by height.
    active: Vec<Hash>,
    events: Arc<ChainEventBus>,
}

impl ChainIndex {
    /// Index holding only `genesis`, and the operations that persist it.
    pub fn genesis(
        params: ProtocolParams,
        genesis: &Block,
        events: Arc<ChainEventBus>,
    ) -> Result<(Self, Vec<BatchOperation>), ChainError> {
        let hash = genesis.hash();
        let entry = BlockIndexEntry {
            hash,
            height: 0,
            cumulative_difficulty: params.genesis_difficulty as u128,
            difficulty: params.genesis_difficulty,
            parent_hash: genesis.header.parent_hash,
            timestamp: genesis.header.timestamp,
            size: genesis.encoded_size() as u64,
            proposer: genesis.header.proposer,
            status: BlockStatus::Active,
        };
        let tip = ChainTip {
            hash,
            height: 0,
            cumulative_difficulty: entry.cumulative_difficulty,
        };

        let mut ops = block_ops(genesis, &entry)?;
        ops.push(BatchOperation::put(KeyPrefix::height_key(0), hash.to_vec()));
        ops.push(BatchOperation::put(KeyPrefix::metadata_key(TIP_KEY), encode(&tip)?));

        let mut entries = HashMap::new();
        entries.insert(hash, entry);
        let index = Self {
            params,
            entries,
            active: vec![hash],
            events,
        };
        Ok((index, ops))
    }

    /// Rebuild from the store. `None` if the store holds no chain.
    pub fn load<S: KeyValueStore + ?Sized>(
        store: &S,
        params: ProtocolParams,
        events: Arc<ChainEventBus>,
    ) -> Result<Option<Self>, ChainError> {
        let Some(tip_bytes) = store.get(&KeyPrefix::metadata_key(TIP_KEY))? else {
            return Ok(None);
        };
        let tip: ChainTip = decode(&tip_bytes)?;

        let mut entries = HashMap::new();
        for (_, value) in store.prefix_scan(KeyPrefix::IndexEntry.as_bytes())? {
            let entry: BlockIndexEntry = decode(&value)?;
            entries.insert(entry.hash, entry);
        }

        let mut by_height = BTreeMap::new();
        for (key, value) in store.prefix_scan(KeyPrefix::BlockByHeight.as_bytes())? {
            let height = KeyPrefix::BlockByHeight
                .suffix(&key)
                .and_then(|s| <[u8; 8]>::try_from(s).ok())
                .map(u64::from_be_bytes)
                .ok_or_else(|| ChainError::Corrupt("malformed height key".into()))?;
            let hash = Hash::try_from(value.as_slice())
                .map_err(|_| ChainError::Corrupt(format!("malformed hash at height {height}")))?;
            by_height.insert(height, hash);
        }

        let active: Vec<Hash> = by_height.values().copied().collect();
        if by_height.keys().copied().ne(0..active.len() as u64) {
            return Err(ChainError::Corrupt("gap in active heights".into()));
        }
        if active.last() != Some(&tip.hash) {
            return Err(ChainError::Corrupt("tip record disagrees with height index".into()));
        }
        for (height, hash) in active.iter().enumerate() {
            match entries.get(hash) {
                Some(e) if e.is_active() && e.height == height as u64 => {}
                _ => {
                    return Err(ChainError::Corrupt(format!(
                        "active block {} at height {height} has no matching entry",
                        short_hex(hash)
                    )))
                }
            }
        }

        info!(
            "[sc-05] Chain index loaded: {} entries, tip {} at height {}",
            entries.len(),
            short_hex(&tip.hash),
            tip.height
        );
        Ok(Some(Self {
            params,
            entries,
            active,
            events,
        }))
    }

    /// Read a stored block, checking its CRC.
    pub fn get_block<S: KeyValueStore + ?Sized>(store: &S, hash: &Hash) -> Result<Option<Block>, ChainError> {
        let Some(record) = store.get(&KeyPrefix::block_key(hash))? else {
            return Ok(None);
        };
        let payload = unframe(&record)?;
        Ok(Some(decode(payload)?))
    }

    /// Heights at or below this can no longer be disconnected.
    pub fn finalized_height(&self) -> Height {
        self.tip_height().saturating_sub(self.params.rollback_limit)
    }

    pub fn tip_height(&self) -> Height {
        self.active.len().saturating_sub(1) as Height
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.entries.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Side entries at or below `finalized`, and every side entry built on
    /// one of them, ascending by height. `keep` is never included.
    fn unreachable_side_entries(&self, finalized: Height, keep: &[Hash]) -> Vec<Hash> {
        let mut side: Vec<&BlockIndexEntry> = self
            .entries
            .values()
            .filter(|e| !e.is_active() && !keep.contains(&e.hash))
            .collect();
        side.sort_by_key(|e| (e.height, e.hash));

        let mut dead = HashSet::new();
        let mut pruned = Vec::new();
        for e in side {
            if e.height <= finalized || dead.contains(&e.parent_hash) {
                dead.insert(e.hash);
                pruned.push(e.hash);
            }
        }
        pruned
    }

    /// Decide where `candidate` goes. Pure: nothing is modified.
    pub fn try_advance(&self, candidate: &BlockIndexEntry) -> Result<ForkChoice, ChainError> {
        if self.entries.contains_key(&candidate.hash) {
            return Ok(ForkChoice::AlreadyKnown);
        }
        let parent = self
            .entries
            .get(&candidate.parent_hash)
            .ok_or(ChainError::UnknownParent(candidate.parent_hash))?;
        if candidate.height != parent.height + 1
            || candidate.cumulative_difficulty <= parent.cumulative_difficulty
        {
            return Err(ChainError::NotMonotonic(candidate.hash));
        }

        let tip = self.active_tip();
        if candidate.parent_hash == tip.hash {
            return Ok(ForkChoice::Extend);
        }

        let mut branch = vec![candidate.hash];
        let mut cursor = parent;
        while !cursor.is_active() {
            branch.push(cursor.hash);
            cursor = self
                .entries
                .get(&cursor.parent_hash)
                .ok_or(ChainError::UnknownParent(cursor.parent_hash))?;
        }

        let depth = tip.height - cursor.height;
        if depth > self.params.rollback_limit {
            return Err(ChainError::ReorgTooDeep {
                depth,
                limit: self.params.rollback_limit,
            });
        }
        if candidate.cumulative_difficulty <= tip.cumulative_difficulty {
            return Ok(ForkChoice::StoredAsSide);
        }

        let disconnect = self.active[cursor.height as usize + 1..]
            .iter()
            .rev()
            .copied()
            .collect();
        branch.reverse();
        Ok(ForkChoice::Reorg {
            disconnect,
            connect: branch,
        })
    }

    /// Plan the commit of a validated block.
    pub fn prepare_commit(&self, block: &Block, candidate: BlockIndexEntry) -> Result<ChainCommit, ChainError> {
        let choice = self.try_advance(&candidate)?;
        let old_tip = self.active_tip();
        let hash = candidate.hash;

        let mut entry = candidate;
        entry.status = if choice.moves_tip() {
            BlockStatus::Active
        } else {
            BlockStatus::Disconnected
        };

        if choice == ForkChoice::AlreadyKnown {
            return Ok(ChainCommit {
                entry,
                choice,
                old_tip,
                new_tip: old_tip,
                pruned: Vec::new(),
                ops: Vec::new(),
            });
        }

        let mut ops = block_ops(block, &entry)?;
        let mut height = old_tip.height;
        for h in choice.disconnect() {
            let mut e = self.entry_or_corrupt(h)?;
            e.status = BlockStatus::Disconnected;
            ops.push(BatchOperation::put(KeyPrefix::entry_key(h), encode(&e)?));
            ops.push(BatchOperation::delete(KeyPrefix::height_key(height)));
            height -= 1;
        }
        let mut new_tip = old_tip;
        for h in choice.connect(&hash) {
            let e = if h == hash {
                entry.clone()
            } else {
                let mut e = self.entry_or_corrupt(&h)?;
                e.status = BlockStatus::Active;
                ops.push(BatchOperation::put(KeyPrefix::entry_key(&h), encode(&e)?));
                e
            };
            ops.push(BatchOperation::put(KeyPrefix::height_key(e.height), h.to_vec()));
            new_tip = ChainTip {
                hash: h,
                height: e.height,
                cumulative_difficulty: e.cumulative_difficulty,
            };
        }
        let mut pruned = Vec::new();
        if new_tip != old_tip {
            ops.push(BatchOperation::put(
                KeyPrefix::metadata_key(TIP_KEY),
                encode(&new_tip)?,
            ));
            let finalized = new_tip.height.saturating_sub(self.params.rollback_limit);
            pruned = self.unreachable_side_entries(finalized, &choice.connect(&hash));
            for h in &pruned {
                ops.push(BatchOperation::delete(KeyPrefix::entry_key(h)));
                ops.push(BatchOperation::delete(KeyPrefix::header_key(h)));
                ops.push(BatchOperation::delete(KeyPrefix::block_key(h)));
            }
        }

        Ok(ChainCommit {
            entry,
            choice,
            old_tip,
            new_tip,
            pruned,
            ops,
        })
    }

    /// Swap in-memory state after the commit's batch is durable. Returns the
    /// events to publish, in order.
    pub fn apply_commit(&mut self, commit: &ChainCommit) -> Vec<ChainEvent> {
        let mut events = Vec::new();
        if commit.choice == ForkChoice::AlreadyKnown {
            return events;
        }
        self.entries.insert(commit.entry.hash, commit.entry.clone());

        for hash in commit.choice.disconnect() {
            if self.active.last() != Some(hash) {
                warn!("[sc-05] Disconnect of non-tip block {} skipped", short_hex(hash));
                continue;
            }
            self.active.pop();
            if let Some(e) = self.entries.get_mut(hash) {
                e.status = BlockStatus::Disconnected;
                events.push(ChainEvent::BlockDisconnected {
                    hash: *hash,
                    height: e.height,
                });
            }
        }
        for hash in commit.choice.connect(&commit.entry.hash) {
            self.active.push(hash);
            if let Some(e) = self.entries.get_mut(&hash) {
                e.status = BlockStatus::Active;
                events.push(ChainEvent::BlockConnected {
                    hash,
                    height: e.height,
                });
            }
        }

        for hash in &commit.pruned {
            self.entries.remove(hash);
        }
        if !commit.pruned.is_empty() {
            debug!(
                "[sc-05] Pruned {} side entries below finalized height",
                commit.pruned.len()
            );
        }

        if commit.choice.moves_tip() {
            events.push(ChainEvent::TipChanged {
                old: commit.old_tip,
                new: commit.new_tip,
                reorg_depth: commit.choice.depth(),
            });
            if commit.choice.depth() > 0 {
                info!(
                    "[sc-05] Reorg: depth {}, tip {} -> {} (height {})",
                    commit.choice.depth(),
                    short_hex(&commit.old_tip.hash),
                    short_hex(&commit.new_tip.hash),
                    commit.new_tip.height
                );
            } else {
                debug!(
                    "[sc-05] Tip extended to {} at height {}",
                    short_hex(&commit.new_tip.hash),
                    commit.new_tip.height
                );
            }
        } else {
            debug!(
                "[sc-05] Side block {} stored at height {}",
                short_hex(&commit.entry.hash),
                commit.entry.height
            );
        }
        events
    }

    /// Register an observer of chain events.
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        self.events.register(filter)
    }

    /// Remove an observer.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unregister(id)
    }

    /// Deliver events produced by `apply_commit`.
    pub fn publish(&self, events: Vec<ChainEvent>) {
        for event in events {
            self.events.publish(event);
        }
    }

    /// The event channel.
    pub fn events(&self) -> &Arc<ChainEventBus> {
        &self.events
    }

    fn entry_or_corrupt(&self, hash: &Hash) -> Result<BlockIndexEntry, ChainError> {
        self.entries
            .get(hash)
            .cloned()
            .ok_or_else(|| ChainError::Corrupt(format!("missing entry {}", short_hex(hash))))
    }
}

impl ChainReader for ChainIndex {
    fn entry(&self, hash: &Hash) -> Option<BlockIndexEntry> {
        self.entries.get(hash).cloned()
    }

    fn active_tip(&self) -> ChainTip {
        let Some(entry) = self.active.last().and_then(|h| self.entries.get(h)) else {
            return ChainTip {
                hash: [0u8; 32],
                height: 0,
                cumulative_difficulty: 0,
            };
        };
        ChainTip {
            hash: entry.hash,
            height: entry.height,
            cumulative_difficulty: entry.cumulative_difficulty,
        }
    }

    fn active_hash_at(&self, height: Height) -> Option<Hash> {
        self.active.get(height as usize).copied()
    }
}

fn block_ops(block: &Block, entry: &BlockIndexEntry) -> Result<Vec<BatchOperation>, ChainError> {
    Ok(vec![
        BatchOperation::put(KeyPrefix::block_key(&entry.hash), frame(&encode(block)?)),
        BatchOperation::put(KeyPrefix::header_key(&entry.hash), encode(&block.header)?),
        BatchOperation::put(KeyPrefix::entry_key(&entry.hash), encode(entry)?),
    ])
}
