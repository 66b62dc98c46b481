//! # Transaction Pool Service
//!
//! Admission policy over [`PoolIndex`]. Every entry is valid against the
//! active tip on its own, together with its sender's lower-sequence pooled
//! transactions.

use std::collections::HashSet;

use sc_02_ledger::{check_anchor, check_standalone, StateView};
use sc_03_pos_rules::{check_fee, ProtocolParams};
use shared_types::{short_hex, ChainReader, Hash, Transaction};
use tracing::{debug, info};

use crate::domain::entities::{Admission, PooledTx, TxPoolConfig};
use crate::domain::errors::PoolError;
use crate::domain::pool::PoolIndex;

/// Valid-but-unconfirmed transactions, ordered for block assembly.
///
/// In memory only; a restarted node starts with an empty pool.
pub struct TxPool {
    params: ProtocolParams,
    index: PoolIndex,
}

impl TxPool {
    pub fn new(params: ProtocolParams, config: TxPoolConfig) -> Self {
        Self {
            params,
            index: PoolIndex::new(config.max_bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Encoded bytes held.
    pub fn bytes(&self) -> usize {
        self.index.bytes()
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.index.contains(hash)
    }

    pub fn get(&self, hash: &Hash) -> Option<&Transaction> {
        self.index.get(hash).map(|entry| &entry.tx)
    }

    /// Pooled hashes, sorted.
    pub fn hashes(&self) -> Vec<Hash> {
        let mut hashes: Vec<Hash> = self.index.hashes().copied().collect();
        hashes.sort();
        hashes
    }

    /// Fee floor check, independent of pool state.
    pub fn check_fee(&self, size: u64, amount: u64) -> bool {
        check_fee(size, amount, self.params.min_fee_rate)
    }

    /// Admit `tx` against the active tip.
    ///
    /// `tip` must be the ledger view of `chain`'s active tip. A transaction
    /// already pooled is accepted without change.
    pub fn admit(
        &mut self,
        tx: Transaction,
        chain: &dyn ChainReader,
        tip: &StateView,
    ) -> Result<Admission, PoolError> {
        self.insert_checked(tx, chain, tip, true)
    }

    fn insert_checked(
        &mut self,
        tx: Transaction,
        chain: &dyn ChainReader,
        tip: &StateView,
        check_signature: bool,
    ) -> Result<Admission, PoolError> {
        let entry = PooledTx::new(tx);
        if self.index.contains(&entry.hash) {
            return Ok(Admission::AlreadyPooled);
        }
        self.validate(&entry, chain, tip, check_signature)?;

        let Some(evict) = self.index.plan_eviction(&entry) else {
            return Err(PoolError::PoolFull {
                size: entry.size,
                available: self.index.available(),
                capacity: self.index.capacity(),
            });
        };
        for hash in &evict {
            self.index.remove(hash);
        }
        if !evict.is_empty() {
            debug!(
                "[sc-06] Evicted {} lower fee-rate transactions for {}",
                evict.len(),
                short_hex(&entry.hash)
            );
        }
        debug!(
            "[sc-06] Admitted {} (seq {}, {} bytes, rate {})",
            short_hex(&entry.hash),
            entry.sequence(),
            entry.size,
            entry.rate.per_quantum()
        );
        self.index.insert(entry);
        Ok(Admission::Added { evicted: evict })
    }

    /// Remove `confirmed` and drop every entry that no longer applies on
    /// the new tip. Returns the dropped hashes, sorted.
    pub fn on_block_committed(
        &mut self,
        confirmed: &[Hash],
        chain: &dyn ChainReader,
        tip: &StateView,
    ) -> Vec<Hash> {
        self.rebuild(Vec::new(), confirmed, chain, tip)
    }

    /// After a reorg: re-admit transactions from `disconnected` blocks that
    /// are still valid and not in `confirmed`, then revalidate the rest.
    /// Returns the pooled hashes dropped, sorted.
    ///
    /// `disconnected` must come from committed blocks. Their signatures were
    /// checked when the block was validated and are not checked again.
    pub fn on_rollback(
        &mut self,
        disconnected: Vec<Transaction>,
        confirmed: &[Hash],
        chain: &dyn ChainReader,
        tip: &StateView,
    ) -> Vec<Hash> {
        self.rebuild(disconnected, confirmed, chain, tip)
    }

    /// Highest fee-rate transactions fitting in `max_bytes`, in an order
    /// that applies cleanly on the tip.
    pub fn select_for_block(&self, max_bytes: usize) -> Vec<Transaction> {
        self.index.select(max_bytes)
    }

    fn validate(
        &self,
        entry: &PooledTx,
        chain: &dyn ChainReader,
        tip: &StateView,
        check_signature: bool,
    ) -> Result<(), PoolError> {
        let tx = &entry.tx;
        check_standalone(tx, &self.params)?;
        check_anchor(chain, &tip.block_hash(), tx, &self.params)?;

        if let Some(existing) = self.index.sequence_holder(tx.sender(), tx.sequence()) {
            return Err(PoolError::SequenceTaken {
                sequence: tx.sequence(),
                existing,
            });
        }

        let mut pending = tip.begin(&self.params);
        for earlier in self.index.sender_chain(tx.sender(), tx.sequence()) {
            pending.apply_verified(earlier).into_result()?;
        }
        let outcome = if check_signature {
            pending.apply_transaction(tx)
        } else {
            pending.apply_verified(tx)
        };
        outcome
            .into_result()
            .map(|_| ())
            .map_err(PoolError::from)
    }

    fn rebuild(
        &mut self,
        disconnected: Vec<Transaction>,
        confirmed: &[Hash],
        chain: &dyn ChainReader,
        tip: &StateView,
    ) -> Vec<Hash> {
        let confirmed: HashSet<Hash> = confirmed.iter().copied().collect();
        let previous: Vec<Hash> = self.hashes();
        let restored = disconnected.len();

        let mut candidates: Vec<Transaction> = self
            .index
            .drain()
            .into_iter()
            .map(|entry| entry.tx)
            .chain(disconnected)
            .collect();
        candidates.sort_by_key(|tx| (tx.sequence(), tx.hash()));
        candidates.dedup_by_key(|tx| tx.hash());

        for tx in candidates {
            let hash = tx.hash();
            if confirmed.contains(&hash) {
                continue;
            }
            // Pooled entries passed admission; the rest come from committed blocks.
            if let Err(err) = self.insert_checked(tx, chain, tip, false) {
                debug!("[sc-06] Dropped {} on revalidation: {}", short_hex(&hash), err);
            }
        }

        let evicted: Vec<Hash> = previous
            .into_iter()
            .filter(|h| !confirmed.contains(h) && !self.index.contains(h))
            .collect();
        if !evicted.is_empty() || restored > 0 {
            info!(
                "[sc-06] Pool revalidated at height {}: {} pooled, {} evicted, {} offered back",
                tip.height(),
                self.index.len(),
                evicted.len(),
                restored
            );
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sc_01_storage::{InMemoryKVStore, KeyValueStore};
    use sc_02_ledger::{Account, Ledger, RejectReason};
    use sc_05_chain_index::ChainIndex;
    use shared_bus::ChainEventBus;
    use shared_crypto::Ed25519KeyPair;
    use shared_types::{Block, BlockIndexEntry, BlockStatus, PublicKey, TxBody, TxPayload};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn key(seed: u8) -> Ed25519KeyPair {
        Ed25519KeyPair::from_seed([seed; 32])
    }

    fn pk(seed: u8) -> PublicKey {
        *key(seed).public_key().as_bytes()
    }

    struct Node {
        params: ProtocolParams,
        index: ChainIndex,
        ledger: Ledger,
        store: InMemoryKVStore,
        genesis: Hash,
    }

    impl Node {
        fn new() -> Self {
            let params = ProtocolParams::for_testing();
            let genesis = Block::genesis(1_000);
            let (index, mut ops) =
                ChainIndex::genesis(params.clone(), &genesis, Arc::new(ChainEventBus::new()))
                    .unwrap();
            let mut allocations = BTreeMap::new();
            for seed in 1..=4u8 {
                allocations.insert(pk(seed), Account::with_balance(10_000_000));
            }
            let ledger = Ledger::from_genesis(params.clone(), genesis.hash(), allocations);
            ops.extend(ledger.genesis_ops().unwrap());
            let mut store = InMemoryKVStore::new();
            store.atomic_batch_write(ops).unwrap();
            Self {
                params,
                index,
                ledger,
                store,
                genesis: genesis.hash(),
            }
        }

        fn tip(&self) -> StateView {
            self.ledger.open_tip()
        }

        /// Commit a block with `txs` on the tip, bypassing the validator.
        fn commit(&mut self, txs: Vec<Transaction>) -> Hash {
            let parent = self.index.entry(&self.ledger.tip_hash()).unwrap();
            let block = Block::propose(parent.hash, parent.timestamp + 60, txs, &key(1));
            let hash = block.hash();

            let mut pending = self.tip().begin(&self.params);
            for tx in &block.transactions {
                pending.apply_transaction(tx).into_result().unwrap();
            }
            self.ledger
                .insert_validated(pending.finish(hash, &pk(1)).unwrap());
            self.ledger.commit(&mut self.store, &[], &[hash]).unwrap();

            let entry = BlockIndexEntry {
                hash,
                height: parent.height + 1,
                cumulative_difficulty: parent.cumulative_difficulty + 1_000,
                difficulty: 1_000,
                parent_hash: parent.hash,
                timestamp: block.header.timestamp,
                size: block.encoded_size() as u64,
                proposer: pk(1),
                status: BlockStatus::Disconnected,
            };
            let commit = self.index.prepare_commit(&block, entry).unwrap();
            self.index.apply_commit(&commit);
            hash
        }
    }

    fn transfer(seed: u8, sequence: u64, fee: u64, reference: Hash) -> Transaction {
        Transaction::sign(
            TxBody {
                sender: pk(seed),
                sequence,
                reference,
                fee,
                payload: TxPayload::Transfer {
                    to: pk(9),
                    amount: 1_000,
                },
            },
            &key(seed),
        )
    }

    fn pool(node: &Node) -> TxPool {
        TxPool::new(node.params.clone(), TxPoolConfig::default())
    }

    #[test]
    fn test_admit_and_duplicate_is_noop() {
        let node = Node::new();
        let mut pool = pool(&node);
        let tx = transfer(2, 1, 10_000, node.genesis);

        assert_eq!(
            pool.admit(tx.clone(), &node.index, &node.tip()),
            Ok(Admission::Added { evicted: vec![] })
        );
        assert_eq!(
            pool.admit(tx, &node.index, &node.tip()),
            Ok(Admission::AlreadyPooled)
        );
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_fee_below_floor_rejected() {
        let node = Node::new();
        let mut pool = pool(&node);
        let err = pool
            .admit(transfer(2, 1, 1, node.genesis), &node.index, &node.tip())
            .unwrap_err();
        assert!(matches!(err, PoolError::Rejected(RejectReason::FeeBelowFloor { .. })));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_check_fee_vectors() {
        let params = ProtocolParams {
            min_fee_rate: 100_000,
            ..ProtocolParams::for_testing()
        };
        let pool = TxPool::new(params, TxPoolConfig::default());
        assert!(pool.check_fee(184, 100_000));
        assert!(!pool.check_fee(1_000, 100_000));
    }

    #[test]
    fn test_sender_chain_admitted_in_sequence() {
        let node = Node::new();
        let mut pool = pool(&node);
        for seq in 1..=3 {
            pool.admit(transfer(2, seq, 10_000, node.genesis), &node.index, &node.tip())
                .unwrap();
        }
        let gap = pool.admit(transfer(2, 5, 10_000, node.genesis), &node.index, &node.tip());
        assert_eq!(
            gap,
            Err(PoolError::Rejected(RejectReason::BadSequence { expected: 4, got: 5 }))
        );
        let taken = pool.admit(transfer(2, 2, 20_000, node.genesis), &node.index, &node.tip());
        assert!(matches!(taken, Err(PoolError::SequenceTaken { sequence: 2, .. })));
    }

    #[test]
    fn test_bad_anchor_rejected() {
        let node = Node::new();
        let mut pool = pool(&node);
        let err = pool
            .admit(transfer(2, 1, 10_000, [0xCD; 32]), &node.index, &node.tip())
            .unwrap_err();
        assert_eq!(err, PoolError::Rejected(RejectReason::BadAnchor));
    }

    #[test]
    fn test_full_pool_evicts_lowest_rate_only() {
        let node = Node::new();
        let size = transfer(2, 1, 10_000, node.genesis).encoded_size();
        let mut pool = TxPool::new(
            node.params.clone(),
            TxPoolConfig {
                max_bytes: size * 2,
            },
        );
        let low = transfer(2, 1, 10_000, node.genesis);
        let mid = transfer(3, 1, 20_000, node.genesis);
        pool.admit(low.clone(), &node.index, &node.tip()).unwrap();
        pool.admit(mid.clone(), &node.index, &node.tip()).unwrap();

        let high = transfer(4, 1, 30_000, node.genesis);
        assert_eq!(
            pool.admit(high.clone(), &node.index, &node.tip()),
            Ok(Admission::Added {
                evicted: vec![low.hash()]
            })
        );
        assert!(pool.contains(&mid.hash()));
        assert!(pool.contains(&high.hash()));

        let equal = transfer(2, 1, 20_000, node.genesis);
        assert!(matches!(
            pool.admit(equal, &node.index, &node.tip()),
            Err(PoolError::PoolFull { .. })
        ));
        assert!(pool.bytes() <= size * 2);
    }

    #[test]
    fn test_commit_removes_confirmed_and_rejects_replay() {
        let mut node = Node::new();
        let mut pool = pool(&node);
        let tx1 = transfer(2, 1, 10_000, node.genesis);
        let tx2 = transfer(2, 2, 10_000, node.genesis);
        let other = transfer(3, 1, 10_000, node.genesis);
        for tx in [&tx1, &tx2, &other] {
            pool.admit(tx.clone(), &node.index, &node.tip()).unwrap();
        }

        node.commit(vec![tx1.clone()]);
        let evicted = pool.on_block_committed(&[tx1.hash()], &node.index, &node.tip());

        assert!(evicted.is_empty());
        assert!(!pool.contains(&tx1.hash()));
        assert!(pool.contains(&tx2.hash()));
        assert!(pool.contains(&other.hash()));

        let replay = pool.admit(tx1, &node.index, &node.tip());
        assert_eq!(
            replay,
            Err(PoolError::Rejected(RejectReason::BadSequence { expected: 2, got: 1 }))
        );
    }

    #[test]
    fn test_conflicting_confirmation_evicts_stale_entry() {
        let mut node = Node::new();
        let mut pool = pool(&node);
        let pooled = transfer(2, 1, 10_000, node.genesis);
        let follower = transfer(2, 2, 10_000, node.genesis);
        pool.admit(pooled.clone(), &node.index, &node.tip()).unwrap();
        pool.admit(follower.clone(), &node.index, &node.tip()).unwrap();

        // same sequence, different content, confirmed elsewhere
        let rival = transfer(2, 1, 11_000, node.genesis);
        node.commit(vec![rival.clone()]);
        let evicted = pool.on_block_committed(&[rival.hash()], &node.index, &node.tip());

        assert_eq!(evicted, vec![pooled.hash()]);
        assert!(pool.contains(&follower.hash()));
    }

    #[test]
    fn test_rollback_readmits_disconnected() {
        let mut node = Node::new();
        let mut pool = pool(&node);
        let tx = transfer(2, 1, 10_000, node.genesis);
        node.commit(vec![tx.clone()]);
        assert!(pool.is_empty());

        let genesis_view = node.ledger.open(0).unwrap();
        let evicted = pool.on_rollback(vec![tx.clone()], &[], &node.index, &genesis_view);
        assert!(evicted.is_empty());
        assert!(pool.contains(&tx.hash()));
    }

    #[test]
    fn test_revalidation_does_not_recheck_signatures() {
        let mut node = Node::new();
        let mut pool = pool(&node);
        let pooled = transfer(3, 1, 10_000, node.genesis);
        pool.admit(pooled.clone(), &node.index, &node.tip()).unwrap();

        let mut unsigned = transfer(2, 1, 10_000, node.genesis);
        unsigned.signature = [0u8; 64];
        assert_eq!(
            pool.admit(unsigned.clone(), &node.index, &node.tip()),
            Err(PoolError::Rejected(RejectReason::BadSignature))
        );

        // Offered back from a disconnected block, the transaction is replayed
        // for sequence and funds only.
        node.commit(vec![]);
        let evicted = pool.on_rollback(vec![unsigned.clone()], &[], &node.index, &node.tip());
        assert!(evicted.is_empty());
        assert!(pool.contains(&unsigned.hash()));
        assert!(pool.contains(&pooled.hash()));
    }

    #[test]
    fn test_select_for_block_orders_by_rate() {
        let node = Node::new();
        let mut pool = pool(&node);
        let cheap = transfer(2, 1, 10_000, node.genesis);
        let rich = transfer(3, 1, 50_000, node.genesis);
        pool.admit(cheap.clone(), &node.index, &node.tip()).unwrap();
        pool.admit(rich.clone(), &node.index, &node.tip()).unwrap();

        let picked: Vec<Hash> = pool
            .select_for_block(usize::MAX)
            .iter()
            .map(|t| t.hash())
            .collect();
        assert_eq!(picked, vec![rich.hash(), cheap.hash()]);
    }
}
