//! # Pool Index
//!
//! The pool's data structure, with no validation of its own.
//!
//! ## Indices
//!
//! - `by_hash`: entry lookup
//! - `by_rate`: eviction order (`PriorityKey`, lowest rate first)
//! - `by_sender`: sequence-ordered hashes per sender
//!
//! `bytes` always equals the sum of entry sizes.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap, HashSet, VecDeque};

use sc_03_pos_rules::FeeRate;
use shared_types::{Hash, PublicKey, Transaction};

use crate::domain::entities::{PooledTx, PriorityKey};

#[derive(Debug, Clone)]
pub struct PoolIndex {
    capacity: usize,
    by_hash: HashMap<Hash, PooledTx>,
    by_rate: BTreeSet<PriorityKey>,
    by_sender: HashMap<PublicKey, BTreeMap<u64, Hash>>,
    bytes: usize,
}

impl PoolIndex {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            by_hash: HashMap::new(),
            by_rate: BTreeSet::new(),
            by_sender: HashMap::new(),
            bytes: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    /// Encoded bytes held.
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.capacity.saturating_sub(self.bytes)
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.by_hash.contains_key(hash)
    }

    pub fn get(&self, hash: &Hash) -> Option<&PooledTx> {
        self.by_hash.get(hash)
    }

    /// Hash of the pooled transaction using `sequence` for `sender`.
    pub fn sequence_holder(&self, sender: &PublicKey, sequence: u64) -> Option<Hash> {
        self.by_sender.get(sender)?.get(&sequence).copied()
    }

    /// `sender`'s pooled transactions with sequence below `below`, ascending.
    pub fn sender_chain(&self, sender: &PublicKey, below: u64) -> Vec<&Transaction> {
        let Some(seqs) = self.by_sender.get(sender) else {
            return Vec::new();
        };
        seqs.range(..below)
            .filter_map(|(_, h)| self.by_hash.get(h))
            .map(|entry| &entry.tx)
            .collect()
    }

    /// Every pooled hash, unordered.
    pub fn hashes(&self) -> impl Iterator<Item = &Hash> {
        self.by_hash.keys()
    }

    pub fn insert(&mut self, entry: PooledTx) {
        if self.by_hash.contains_key(&entry.hash) {
            return;
        }
        self.by_rate.insert(entry.key());
        self.by_sender
            .entry(*entry.sender())
            .or_default()
            .insert(entry.sequence(), entry.hash);
        self.bytes += entry.size;
        self.by_hash.insert(entry.hash, entry);
    }

    pub fn remove(&mut self, hash: &Hash) -> Option<PooledTx> {
        let entry = self.by_hash.remove(hash)?;
        self.by_rate.remove(&entry.key());
        if let Some(seqs) = self.by_sender.get_mut(entry.sender()) {
            seqs.remove(&entry.sequence());
            if seqs.is_empty() {
                self.by_sender.remove(entry.sender());
            }
        }
        self.bytes -= entry.size;
        Some(entry)
    }

    /// Empty the pool, returning every entry.
    pub fn drain(&mut self) -> Vec<PooledTx> {
        self.by_rate.clear();
        self.by_sender.clear();
        self.bytes = 0;
        self.by_hash.drain().map(|(_, entry)| entry).collect()
    }

    /// Entries to evict so `incoming` fits, or `None` if it cannot.
    ///
    /// Only entries with a fee rate strictly below `incoming`'s are
    /// candidates. Each victim takes its same-sender successors with it,
    /// since they can no longer apply. The incoming transaction's own
    /// predecessors are never evicted.
    pub fn plan_eviction(&self, incoming: &PooledTx) -> Option<Vec<Hash>> {
        let need = (self.bytes + incoming.size).saturating_sub(self.capacity);
        if need == 0 {
            return Some(Vec::new());
        }
        if incoming.size > self.capacity {
            return None;
        }

        let mut victims = HashSet::new();
        let mut order = Vec::new();
        let mut freed = 0usize;
        for key in &self.by_rate {
            if key.rate >= incoming.rate {
                break;
            }
            if victims.contains(&key.hash) {
                continue;
            }
            let Some(entry) = self.by_hash.get(&key.hash) else {
                continue;
            };
            if entry.sender() == incoming.sender() && entry.sequence() < incoming.sequence() {
                continue;
            }
            let Some(seqs) = self.by_sender.get(entry.sender()) else {
                continue;
            };
            for hash in seqs.range(entry.sequence()..).map(|(_, h)| h) {
                if victims.insert(*hash) {
                    freed += self.by_hash.get(hash).map_or(0, |e| e.size);
                    order.push(*hash);
                }
            }
            if freed >= need {
                return Some(order);
            }
        }
        None
    }

    /// Highest fee-rate transactions fitting in `max_bytes`, each sender's
    /// transactions in sequence order. A sender whose next transaction does
    /// not fit contributes nothing further.
    pub fn select(&self, max_bytes: usize) -> Vec<Transaction> {
        let mut queues: HashMap<PublicKey, VecDeque<Hash>> = self
            .by_sender
            .iter()
            .map(|(sender, seqs)| (*sender, seqs.values().copied().collect()))
            .collect();

        let mut heads: BinaryHeap<(FeeRate, Reverse<Hash>, PublicKey)> = BinaryHeap::new();
        for (sender, queue) in queues.iter_mut() {
            if let Some(entry) = queue.pop_front().and_then(|h| self.by_hash.get(&h)) {
                heads.push((entry.rate, Reverse(entry.hash), *sender));
            }
        }

        let mut selected = Vec::new();
        let mut used = 0usize;
        while let Some((_, Reverse(hash), sender)) = heads.pop() {
            let Some(entry) = self.by_hash.get(&hash) else {
                continue;
            };
            if used + entry.size > max_bytes {
                continue;
            }
            used += entry.size;
            selected.push(entry.tx.clone());
            let next = queues
                .get_mut(&sender)
                .and_then(|q| q.pop_front())
                .and_then(|h| self.by_hash.get(&h));
            if let Some(next) = next {
                heads.push((next.rate, Reverse(next.hash), sender));
            }
        }
        selected
    }
}
