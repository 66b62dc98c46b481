//! # Determinism
//!
//! Two nodes fed the same block set, in any order, end on the same tip with
//! byte-identical state.
//!
//! ## Block Tree
//!
//! ```text
//! G - b1 - b2 - b3 - b4 - b5 - b6 - b7 - b8     (validator A, user transfers)
//!               \
//!                f4 - f5 - f6                    (validator B, empty)
//! ```
//!
//! The fork is lighter than the main branch once all blocks arrive, but may
//! hold the tip for a while depending on delivery order.

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use shared_types::{Block, Hash};

    use crate::fixtures::*;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const MAIN_LEN: u64 = 8;

    /// Main branch with one user transfer per block, then the fork off b3.
    fn block_tree(genesis: Hash) -> (Vec<Block>, Vec<Block>) {
        let mut main = Vec::new();
        let mut parent = genesis;
        for h in 1..=MAIN_LEN {
            let tx = transfer(USER, h, genesis, 1_000 + h);
            let block = block_with(parent, h, VALIDATOR_A, vec![tx]);
            parent = block.hash();
            main.push(block);
        }
        let fork = build_branch(main[2].hash(), 4, 3, VALIDATOR_B, 7);
        (main, fork)
    }

    fn deliver(blocks: Vec<Block>) -> (Hash, Hash) {
        let manager = new_manager();
        for block in blocks {
            manager.submit_block(block).expect("valid block");
        }
        assert_eq!(manager.orphan_count(), 0);
        (manager.tip().hash, manager.tip_state().digest())
    }

    // =============================================================================
    // TESTS
    // =============================================================================

    #[test]
    fn test_same_order_same_state() {
        let genesis = test_genesis().hash();
        let (main, fork) = block_tree(genesis);
        let blocks: Vec<Block> = main.into_iter().chain(fork).collect();

        let first = deliver(blocks.clone());
        let second = deliver(blocks);
        assert_eq!(first, second);
    }

    #[test]
    fn test_shuffled_delivery_converges() {
        let genesis = test_genesis().hash();
        let (main, fork) = block_tree(genesis);
        let expected_tip = main[MAIN_LEN as usize - 1].hash();
        let blocks: Vec<Block> = main.into_iter().chain(fork).collect();

        let (reference_tip, reference_digest) = deliver(blocks.clone());
        assert_eq!(reference_tip, expected_tip);

        for seed in 0..8u64 {
            let mut shuffled = blocks.clone();
            shuffled.shuffle(&mut StdRng::seed_from_u64(seed));
            let (tip, digest) = deliver(shuffled);
            assert_eq!(tip, expected_tip, "seed {seed}");
            assert_eq!(digest, reference_digest, "seed {seed}");
        }
    }

    #[test]
    fn test_state_matches_applied_transfers() {
        let genesis = test_genesis().hash();
        let (main, _) = block_tree(genesis);
        let manager = new_manager();
        for block in main {
            manager.submit_block(block).unwrap();
        }

        let user = manager.account(&pk(USER));
        assert_eq!(user.sequence, MAIN_LEN);
        let sent: u64 = (1..=MAIN_LEN).map(|h| 1_000 + h + TX_FEE).sum();
        assert_eq!(user.balance, USER_BALANCE - sent);
        assert_eq!(
            manager.account(&pk(RECIPIENT)).balance,
            (1..=MAIN_LEN).map(|h| 1_000 + h).sum::<u64>()
        );
    }

    #[test]
    fn test_historical_state_is_stable() {
        let genesis = test_genesis().hash();
        let (main, fork) = block_tree(genesis);
        let manager = new_manager();
        for block in main.iter().take(4).cloned() {
            manager.submit_block(block).unwrap();
        }
        let at_three = manager.state_at(3).unwrap().digest();

        for block in main.into_iter().skip(4).chain(fork) {
            manager.submit_block(block).unwrap();
        }
        assert_eq!(manager.state_at(3).unwrap().digest(), at_three);
    }
}
