//! Blocks waiting on something transient: a parent that has not been
//! committed yet, or a local clock that has not reached their timestamp.
//!
//! Entries are keyed by `Block::witness_hash`, so a forged copy of a block
//! never displaces the genuine one.

use std::num::NonZeroUsize;

use lru::LruCache;
use shared_types::{Block, Hash};

/// Bounded by block count; the oldest parked block is evicted first.
pub struct OrphanPool {
    blocks: LruCache<Hash, Block>,
}

impl OrphanPool {
    pub fn new(limit: usize) -> Self {
        let cap = NonZeroUsize::new(limit.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            blocks: LruCache::new(cap),
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.blocks.contains(hash)
    }

    /// Park `block`. Returns the id of the block evicted to make room.
    pub fn insert(&mut self, block: Block) -> Option<Hash> {
        let key = block.witness_hash();
        match self.blocks.push(key, block) {
            Some((evicted, old)) if evicted != key => Some(old.hash()),
            _ => None,
        }
    }

    /// Remove and return every parked child of `parent`, ordered by key.
    pub fn take_children(&mut self, parent: &Hash) -> Vec<Block> {
        let mut hashes: Vec<Hash> = self
            .blocks
            .iter()
            .filter(|(_, b)| b.header.parent_hash == *parent)
            .map(|(h, _)| *h)
            .collect();
        hashes.sort_unstable();
        hashes
            .iter()
            .filter_map(|h| self.blocks.pop(h))
            .collect()
    }

    /// Remove and return every parked block, oldest first.
    pub fn drain(&mut self) -> Vec<Block> {
        let mut blocks = Vec::with_capacity(self.blocks.len());
        while let Some((_, block)) = self.blocks.pop_lru() {
            blocks.push(block);
        }
        blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::Ed25519KeyPair;

    fn block(parent: Hash, ts: u64) -> Block {
        Block::propose(parent, ts, vec![], &Ed25519KeyPair::from_seed([1u8; 32]))
    }

    #[test]
    fn test_children_released_by_parent() {
        let mut pool = OrphanPool::new(8);
        let a = block([1u8; 32], 10);
        let b = block([1u8; 32], 11);
        let c = block([2u8; 32], 12);
        for blk in [&a, &b, &c] {
            assert!(pool.insert(blk.clone()).is_none());
        }

        let children = pool.take_children(&[1u8; 32]);
        assert_eq!(children.len(), 2);
        assert!(children[0].witness_hash() < children[1].witness_hash());
        assert_eq!(pool.len(), 1);
        assert!(pool.contains(&c.witness_hash()));
        assert!(pool.take_children(&[1u8; 32]).is_empty());
    }

    #[test]
    fn test_oldest_evicted_when_full() {
        let mut pool = OrphanPool::new(2);
        let a = block([1u8; 32], 10);
        pool.insert(a.clone());
        pool.insert(block([1u8; 32], 11));
        assert_eq!(pool.insert(block([1u8; 32], 12)), Some(a.hash()));
        assert_eq!(pool.len(), 2);
        assert!(pool.insert(block([1u8; 32], 12)).is_none());
    }

    #[test]
    fn test_forged_copy_parks_beside_genuine() {
        let mut pool = OrphanPool::new(8);
        let genuine = block([1u8; 32], 10);
        let mut forged = genuine.clone();
        forged.header.signature[0] ^= 1;

        pool.insert(forged.clone());
        pool.insert(genuine.clone());
        assert_eq!(pool.len(), 2);
        assert!(pool.contains(&genuine.witness_hash()));
        assert!(pool.contains(&forged.witness_hash()));
    }

    #[test]
    fn test_drain_returns_oldest_first() {
        let mut pool = OrphanPool::new(8);
        let a = block([1u8; 32], 10);
        let b = block([2u8; 32], 11);
        pool.insert(a.clone());
        pool.insert(b.clone());
        assert_eq!(pool.drain(), vec![a, b]);
        assert!(pool.is_empty());
    }
}
