//! # Chain Manager
//!
//! Single writer in front of the chain index, ledger and transaction pool.
//!
//! ## Locking
//!
//! | Lock | Guards | Held |
//! |------|--------|------|
//! | `store` (mutex) | the commit section | plan, batch write, in-memory swap |
//! | `index`, `ledger` (rwlock) | committed chain and state | write only while swapping |
//! | `pool` (rwlock) | pooled transactions | admission, post-commit rebuild |
//!
//! Locks are always taken in the order store, index, ledger, pool.
//!
//! Block validation captures a `BlockContext` under brief read locks and runs
//! with no lock held, so signature checks and transaction replay never block
//! a commit. Only the final plan/write/apply step is serialized. The pool is
//! rebuilt after the commit section is released, and replays its entries
//! without checking their signatures again.
//!
//! ## Commit
//!
//! 1. Chain index and ledger each plan their store operations
//! 2. Both go to the store in one atomic batch
//! 3. In-memory state is swapped only after the batch is durable
//! 4. The pool is revalidated against the new tip
//! 5. Events are published
//!
//! A failed batch write halts the write path. Reads keep serving the last
//! committed tip.
//!
//! ## Parked blocks
//!
//! Transient validation failures are never final. A block with a missing
//! parent (or parent state) is parked until that parent commits; a block
//! stamped ahead of the local clock is deferred and retried by
//! `retry_deferred`, which the runtime calls on a timer and which also runs
//! after every commit.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use sc_01_storage::KeyValueStore;
use sc_02_ledger::{Account, Ledger, StateView};
use sc_03_pos_rules::{max_block_size, ProtocolParams};
use sc_04_block_validator::{
    BlockContext, BlockValidator, ValidatedBlock, ValidationError, ValidatorConfig,
};
use sc_05_chain_index::{ChainError, ChainIndex, ForkChoice};
use sc_06_txpool::{Admission, TxPool};
use shared_bus::{ChainEvent, ChainEventBus, EventFilter, Subscription, SubscriptionId};
use shared_crypto::Ed25519KeyPair;
use shared_types::{
    short_hex, Block, BlockIndexEntry, ChainReader, ChainTip, Hash, Height, PublicKey, Transaction,
};
use tracing::{debug, error, info, warn};

use crate::container::config::NodeConfig;
use crate::container::errors::NodeError;
use crate::container::orphans::OrphanPool;
use crate::genesis::Genesis;

/// What submitting a block did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockOutcome {
    /// Appended to the active tip.
    Extended { height: Height },
    /// Became the tip of a heavier branch.
    Reorganized { height: Height, depth: u64 },
    /// Valid, kept on a branch that is not heavier.
    StoredAsSide { height: Height },
    /// Already indexed.
    AlreadyKnown,
    /// Parked until `parent` commits.
    Orphaned { parent: Hash },
    /// Timestamp ahead of the local clock; retried later.
    Deferred { timestamp: u64 },
}

impl BlockOutcome {
    /// Whether the block is now in the index.
    pub fn is_indexed(&self) -> bool {
        matches!(
            self,
            BlockOutcome::Extended { .. }
                | BlockOutcome::Reorganized { .. }
                | BlockOutcome::StoredAsSide { .. }
        )
    }
}

pub struct ChainManager {
    params: ProtocolParams,
    genesis_hash: Hash,
    store: Mutex<Box<dyn KeyValueStore>>,
    index: RwLock<ChainIndex>,
    ledger: RwLock<Ledger>,
    pool: RwLock<TxPool>,
    validator: BlockValidator,
    orphans: Mutex<OrphanPool>,
    deferred: Mutex<OrphanPool>,
    halted: AtomicBool,
}

impl ChainManager {
    /// Open the chain in `store`, writing `genesis` if the store is empty.
    pub fn open(
        store: Box<dyn KeyValueStore>,
        config: &NodeConfig,
        genesis: &Genesis,
    ) -> Result<Self, NodeError> {
        let validator = BlockValidator::new(
            config.chain.clone(),
            ValidatorConfig {
                reject_cache_size: config.runtime.reject_cache_size,
            },
        );
        Self::open_with(store, config, genesis, validator)
    }

    /// As `open`, with a caller-built validator.
    pub fn open_with(
        mut store: Box<dyn KeyValueStore>,
        config: &NodeConfig,
        genesis: &Genesis,
        validator: BlockValidator,
    ) -> Result<Self, NodeError> {
        let params = config.chain.clone();
        let events = Arc::new(ChainEventBus::new());

        let loaded = ChainIndex::load(&*store, params.clone(), Arc::clone(&events))?;
        let (index, ledger) = match loaded {
            Some(index) => {
                let stored = index.active_hash_at(0).unwrap_or_default();
                if stored != genesis.hash() {
                    return Err(NodeError::GenesisMismatch {
                        stored,
                        configured: genesis.hash(),
                    });
                }
                let ledger = Ledger::load(&*store, params.clone(), index.active_tip())?;
                info!(
                    "[node] Chain reloaded: tip {} at height {}, finalized {}",
                    short_hex(&index.active_tip().hash),
                    index.tip_height(),
                    ledger.finalized_height()
                );
                (index, ledger)
            }
            None => {
                let (index, mut ops) = ChainIndex::genesis(params.clone(), &genesis.block, events)?;
                let ledger = Ledger::from_genesis(
                    params.clone(),
                    genesis.hash(),
                    genesis.allocations.clone(),
                );
                ops.extend(ledger.genesis_ops()?);
                store.atomic_batch_write(ops)?;
                info!(
                    "[node] Genesis {} written with {} allocations",
                    short_hex(&genesis.hash()),
                    genesis.allocations.len()
                );
                (index, ledger)
            }
        };

        Ok(Self {
            genesis_hash: genesis.hash(),
            store: Mutex::new(store),
            index: RwLock::new(index),
            ledger: RwLock::new(ledger),
            pool: RwLock::new(TxPool::new(params.clone(), config.txpool.clone())),
            validator,
            orphans: Mutex::new(OrphanPool::new(config.runtime.orphan_limit)),
            deferred: Mutex::new(OrphanPool::new(config.runtime.orphan_limit)),
            halted: AtomicBool::new(false),
            params,
        })
    }

    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    pub fn genesis_hash(&self) -> Hash {
        self.genesis_hash
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// The last committed tip. Unaffected by a failed commit.
    pub fn tip(&self) -> ChainTip {
        self.index.read().active_tip()
    }

    pub fn finalized_height(&self) -> Height {
        self.ledger.read().finalized_height()
    }

    pub fn contains_block(&self, hash: &Hash) -> bool {
        self.index.read().contains(hash)
    }

    pub fn active_hash_at(&self, height: Height) -> Option<Hash> {
        self.index.read().active_hash_at(height)
    }

    /// Index entry of any validated block, active or not.
    pub fn entry(&self, hash: &Hash) -> Option<BlockIndexEntry> {
        self.index.read().entry(hash)
    }

    /// Stored block by hash.
    pub fn get_block(&self, hash: &Hash) -> Result<Option<Block>, NodeError> {
        let store = self.store.lock();
        Ok(ChainIndex::get_block(&**store, hash)?)
    }

    /// Account at the active tip.
    pub fn account(&self, key: &PublicKey) -> Account {
        self.ledger.read().open_tip().account(key)
    }

    /// State view at the active tip.
    pub fn tip_state(&self) -> StateView {
        self.ledger.read().open_tip()
    }

    /// State view at an active height that has not been finalized away.
    pub fn state_at(&self, height: Height) -> Result<StateView, NodeError> {
        Ok(self.ledger.read().open(height)?)
    }

    pub fn pool_len(&self) -> usize {
        self.pool.read().len()
    }

    pub fn pool_contains(&self, hash: &Hash) -> bool {
        self.pool.read().contains(hash)
    }

    /// Pooled hashes, sorted.
    pub fn pool_hashes(&self) -> Vec<Hash> {
        self.pool.read().hashes()
    }

    /// Fee floor check, independent of pool state.
    pub fn check_fee(&self, size: u64, amount: u64) -> bool {
        self.pool.read().check_fee(size, amount)
    }

    pub fn orphan_count(&self) -> usize {
        self.orphans.lock().len()
    }

    /// Blocks waiting for the local clock to reach their timestamp.
    pub fn deferred_count(&self) -> usize {
        self.deferred.lock().len()
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        self.index.read().subscribe(filter)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.index.read().unsubscribe(id)
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Admit a transaction against the active tip.
    pub fn submit_transaction(&self, tx: Transaction) -> Result<Admission, NodeError> {
        let index = self.index.read();
        let ledger = self.ledger.read();
        let tip = ledger.open_tip();
        let hash = tx.hash();
        let result = self.pool.write().admit(tx, &*index, &tip);
        match &result {
            Ok(Admission::Added { evicted }) if !evicted.is_empty() => {
                index.publish(vec![ChainEvent::TransactionsEvicted {
                    hashes: evicted.clone(),
                }]);
            }
            Err(err) => debug!("[node] Transaction {} refused: {}", short_hex(&hash), err),
            _ => {}
        }
        Ok(result?)
    }

    /// Build and sign a block on the active tip from the best pooled
    /// transactions that fit the current size limit.
    pub fn assemble_block(&self, keypair: &Ed25519KeyPair, timestamp: u64) -> Block {
        let index = self.index.read();
        let tip = index.active_tip();
        let mut sizes: Vec<u64> = index
            .ancestors(&tip.hash, self.params.block_size_window)
            .iter()
            .map(|e| e.size)
            .collect();
        sizes.reverse();
        let limit = max_block_size(&sizes, &self.params) as usize;
        let overhead = Block::propose(tip.hash, timestamp, Vec::new(), keypair).encoded_size();
        let transactions = self
            .pool
            .read()
            .select_for_block(limit.saturating_sub(overhead));
        Block::propose(tip.hash, timestamp, transactions, keypair)
    }

    // =========================================================================
    // Blocks
    // =========================================================================

    /// Validate and commit `block`, then re-drive any orphans waiting on it.
    pub fn submit_block(&self, block: Block) -> Result<BlockOutcome, NodeError> {
        let outcome = self.process_block(&block)?;
        if outcome.is_indexed() {
            self.drive_orphans(block.hash());
            self.retry_deferred();
        }
        Ok(outcome)
    }

    /// Re-validate every deferred block against the current clock. Blocks
    /// still ahead of it are deferred again. Returns how many were indexed.
    pub fn retry_deferred(&self) -> usize {
        let blocks = self.deferred.lock().drain();
        let mut indexed = 0;
        for block in blocks {
            let hash = block.hash();
            match self.process_block(&block) {
                Ok(outcome) if outcome.is_indexed() => {
                    debug!("[node] Deferred {} connected: {:?}", short_hex(&hash), outcome);
                    indexed += 1;
                    self.drive_orphans(hash);
                }
                Ok(_) => {}
                Err(err) => {
                    debug!("[node] Deferred {} dropped: {}", short_hex(&hash), err);
                }
            }
        }
        indexed
    }

    fn process_block(&self, block: &Block) -> Result<BlockOutcome, NodeError> {
        self.ensure_writable()?;
        let hash = block.hash();
        if self.index.read().contains(&hash) {
            return Ok(BlockOutcome::AlreadyKnown);
        }
        if let Some(err) = self.validator.cached_rejection(block) {
            return Err(err.into());
        }
        if block.is_genesis() {
            return Err(ValidationError::UnexpectedGenesis.into());
        }

        let ctx = {
            let index = self.index.read();
            let ledger = self.ledger.read();
            BlockContext::gather(&*index, &ledger, &block.header.parent_hash, &self.params)
        };
        let ctx = match ctx {
            Ok(ctx) => ctx,
            Err(ValidationError::UnknownParent(parent)) => {
                let outcome = self.park(block.clone());
                // The parent may have committed and drained the orphan
                // pool between the lookup and the park.
                if self.index.read().contains(&parent) {
                    self.drive_orphans(parent);
                }
                return Ok(outcome);
            }
            Err(ValidationError::StateUnavailable(_)) => return Ok(self.park(block.clone())),
            Err(err) => return Err(err.into()),
        };

        match self.validator.validate_in_context(block, &ctx) {
            Ok(validated) => self.commit(block, validated),
            Err(ValidationError::TimestampInFuture { timestamp, .. }) => {
                Ok(self.defer(block.clone(), timestamp))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn commit(&self, block: &Block, validated: ValidatedBlock) -> Result<BlockOutcome, NodeError> {
        let mut store = self.store.lock();
        self.ensure_writable()?;
        let mut index = self.index.write();
        let mut ledger = self.ledger.write();

        let ValidatedBlock { entry, delta, .. } = validated;
        let hash = entry.hash;
        let height = entry.height;
        let chain_commit = index.prepare_commit(block, entry)?;
        if chain_commit.choice == ForkChoice::AlreadyKnown {
            return Ok(BlockOutcome::AlreadyKnown);
        }

        ledger.insert_validated(delta);
        let disconnect = chain_commit.choice.disconnect().to_vec();
        let connect = chain_commit.choice.connect(&hash);
        let planned = ledger
            .plan_commit(&disconnect, &connect)
            .map_err(NodeError::from)
            .and_then(|plan| {
                let moved = moved_transactions(&**store, block, &disconnect, &connect)?;
                Ok((plan, moved))
            });
        let (ledger_commit, (restored, confirmed)) = match planned {
            Ok(planned) => planned,
            Err(err) => {
                ledger.discard(&hash);
                warn!("[node] Commit of {} abandoned: {}", short_hex(&hash), err);
                return Err(err);
            }
        };

        let mut ops = chain_commit.ops.clone();
        ops.extend(ledger_commit.ops.iter().cloned());
        if let Err(err) = store.atomic_batch_write(ops) {
            ledger.discard(&hash);
            self.halt(&err);
            return Err(err.into());
        }

        let mut events = index.apply_commit(&chain_commit);
        if let Err(err) = ledger.apply_commit(&ledger_commit) {
            self.halt(&err);
            return Err(err.into());
        }

        let index = RwLockWriteGuard::downgrade(index);
        let ledger = RwLockWriteGuard::downgrade(ledger);
        drop(store);
        if chain_commit.choice.moves_tip() {
            let tip = ledger.open_tip();
            let mut pool = self.pool.write();
            let evicted = if disconnect.is_empty() {
                pool.on_block_committed(&confirmed, &*index, &tip)
            } else {
                pool.on_rollback(restored, &confirmed, &*index, &tip)
            };
            if !evicted.is_empty() {
                events.push(ChainEvent::TransactionsEvicted { hashes: evicted });
            }
        }
        index.publish(events);

        let outcome = match chain_commit.choice {
            ForkChoice::Extend => BlockOutcome::Extended { height },
            ForkChoice::Reorg { .. } => BlockOutcome::Reorganized {
                height,
                depth: chain_commit.choice.depth(),
            },
            ForkChoice::StoredAsSide => BlockOutcome::StoredAsSide { height },
            ForkChoice::AlreadyKnown => BlockOutcome::AlreadyKnown,
        };
        debug!(
            "[node] Block {} committed: {:?} ({} txs)",
            short_hex(&hash),
            outcome,
            block.transactions.len()
        );
        Ok(outcome)
    }

    fn park(&self, block: Block) -> BlockOutcome {
        let parent = block.header.parent_hash;
        let hash = block.hash();
        if let Some(evicted) = self.orphans.lock().insert(block) {
            debug!("[node] Orphan pool full, dropped {}", short_hex(&evicted));
        }
        debug!(
            "[node] Block {} parked until {} commits",
            short_hex(&hash),
            short_hex(&parent)
        );
        BlockOutcome::Orphaned { parent }
    }

    fn defer(&self, block: Block, timestamp: u64) -> BlockOutcome {
        let hash = block.hash();
        if let Some(evicted) = self.deferred.lock().insert(block) {
            debug!("[node] Deferred pool full, dropped {}", short_hex(&evicted));
        }
        debug!(
            "[node] Block {} deferred until the clock reaches {}",
            short_hex(&hash),
            timestamp
        );
        BlockOutcome::Deferred { timestamp }
    }

    fn drive_orphans(&self, committed: Hash) {
        let mut ready = VecDeque::from([committed]);
        while let Some(parent) = ready.pop_front() {
            let children = self.orphans.lock().take_children(&parent);
            for child in children {
                let hash = child.hash();
                match self.process_block(&child) {
                    Ok(outcome) if outcome.is_indexed() => {
                        debug!("[node] Orphan {} connected: {:?}", short_hex(&hash), outcome);
                        ready.push_back(hash);
                    }
                    Ok(_) => {}
                    Err(err) => {
                        debug!("[node] Orphan {} dropped: {}", short_hex(&hash), err);
                    }
                }
            }
        }
    }

    fn ensure_writable(&self) -> Result<(), NodeError> {
        if self.is_halted() {
            return Err(NodeError::WritePathHalted);
        }
        Ok(())
    }

    fn halt(&self, reason: &dyn std::fmt::Display) {
        self.halted.store(true, Ordering::SeqCst);
        error!("[node] Write path halted: {}", reason);
    }
}

/// Transactions leaving the active chain (oldest block first) and the
/// hashes of those joining it.
fn moved_transactions(
    store: &dyn KeyValueStore,
    candidate: &Block,
    disconnect: &[Hash],
    connect: &[Hash],
) -> Result<(Vec<Transaction>, Vec<Hash>), NodeError> {
    let load = |hash: &Hash| -> Result<Block, NodeError> {
        ChainIndex::get_block(store, hash)?.ok_or_else(|| {
            NodeError::Chain(ChainError::Corrupt(format!(
                "indexed block {} missing from store",
                short_hex(hash)
            )))
        })
    };

    let mut restored = Vec::new();
    for hash in disconnect.iter().rev() {
        restored.extend(load(hash)?.transactions);
    }

    let candidate_hash = candidate.hash();
    let mut confirmed = Vec::new();
    for hash in connect {
        if *hash == candidate_hash {
            confirmed.extend(candidate.transactions.iter().map(Transaction::hash));
        } else {
            confirmed.extend(load(hash)?.transactions.iter().map(Transaction::hash));
        }
    }
    Ok((restored, confirmed))
}
