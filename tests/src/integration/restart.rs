//! # Restart
//!
//! A node reopened on its store resumes the same tip, state and finalized
//! height, and can still reorganize within the rollback window.

#[cfg(test)]
mod tests {
    use node_runtime::{BlockOutcome, ChainManager};
    use shared_types::{Block, Hash};

    use crate::fixtures::*;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn open(store: &SharedStore) -> ChainManager {
        ChainManager::open(Box::new(store.clone()), &test_config(), &test_genesis())
            .expect("open manager")
    }

    /// Eight blocks by validator A, each with one user transfer.
    fn main_chain(genesis: Hash) -> Vec<Block> {
        let mut parent = genesis;
        (1..=8u64)
            .map(|h| {
                let block = block_with(parent, h, VALIDATOR_A, vec![transfer(USER, h, genesis, 10 * h)]);
                parent = block.hash();
                block
            })
            .collect()
    }

    // =============================================================================
    // TESTS
    // =============================================================================

    #[test]
    fn test_reload_resumes_tip_and_state() {
        let store = SharedStore::new();
        let g = test_genesis().hash();
        let blocks = main_chain(g);

        let (tip, digest, finalized) = {
            let m = open(&store);
            for block in &blocks {
                m.submit_block(block.clone()).unwrap();
            }
            (m.tip(), m.tip_state().digest(), m.finalized_height())
        };
        assert_eq!(finalized, 8 - test_config().chain.rollback_limit);

        let m = open(&store);
        assert_eq!(m.tip(), tip);
        assert_eq!(m.tip_state().digest(), digest);
        assert_eq!(m.finalized_height(), finalized);
        assert_eq!(m.account(&pk(USER)).sequence, 8);
        assert_eq!(m.get_block(&blocks[3].hash()).unwrap(), Some(blocks[3].clone()));
        for (i, block) in blocks.iter().enumerate() {
            assert_eq!(m.active_hash_at(i as u64 + 1), Some(block.hash()));
        }
        assert_eq!(m.pool_len(), 0);
    }

    #[test]
    fn test_reloaded_chain_keeps_extending() {
        let store = SharedStore::new();
        let g = test_genesis().hash();
        let blocks = main_chain(g);
        {
            let m = open(&store);
            for block in blocks.iter().take(5) {
                m.submit_block(block.clone()).unwrap();
            }
        }

        let m = open(&store);
        for block in blocks.iter().skip(5) {
            assert!(matches!(
                m.submit_block(block.clone()).unwrap(),
                BlockOutcome::Extended { .. }
            ));
        }
        assert_eq!(m.tip().hash, blocks[7].hash());

        // Same history without a restart gives the same state.
        let fresh = new_manager();
        for block in &blocks {
            fresh.submit_block(block.clone()).unwrap();
        }
        assert_eq!(fresh.tip_state().digest(), m.tip_state().digest());
    }

    #[test]
    fn test_reorg_within_window_after_restart() {
        let store = SharedStore::new();
        let g = test_genesis().hash();
        let blocks = main_chain(g);
        {
            let m = open(&store);
            for block in &blocks {
                m.submit_block(block.clone()).unwrap();
            }
        }

        let m = open(&store);
        let before = m.account(&pk(RECIPIENT)).balance;
        let fork = build_branch(blocks[3].hash(), 5, 5, VALIDATOR_B, 1);
        let mut last = None;
        for block in &fork {
            last = Some(m.submit_block(block.clone()).unwrap());
        }
        assert_eq!(
            last,
            Some(BlockOutcome::Reorganized {
                height: 9,
                depth: 4
            })
        );
        assert_eq!(m.tip().hash, fork[4].hash());
        assert_eq!(m.account(&pk(USER)).sequence, 4);
        let undone: u64 = (5..=8u64).map(|h| 10 * h).sum();
        assert_eq!(m.account(&pk(RECIPIENT)).balance, before - undone);
    }

    #[cfg(feature = "rocksdb")]
    mod rocksdb {
        use node_runtime::container::{StorageBackend, StorageConfig};
        use node_runtime::handlers::{Inbound, IntakeOutcome};
        use node_runtime::NodeRuntime;

        use crate::fixtures::*;

        #[tokio::test]
        async fn test_rocksdb_node_survives_restart() {
            let dir = tempfile::tempdir().unwrap();
            let mut config = test_config();
            config.storage = StorageConfig {
                data_dir: dir.path().to_path_buf(),
                backend: StorageBackend::RocksDb,
            };

            let blocks = build_branch(test_genesis().hash(), 1, 4, VALIDATOR_A, 0);
            let tip = {
                let node = NodeRuntime::start(config.clone()).unwrap();
                let intake = node.intake().unwrap();
                for block in &blocks {
                    let outcome = intake.submit(Inbound::Block(block.clone())).await.unwrap();
                    assert!(matches!(outcome, IntakeOutcome::Block(Ok(_))));
                }
                drop(intake);
                let tip = node.manager().tip();
                node.shutdown().await;
                tip
            };
            assert_eq!(tip.hash, blocks[3].hash());

            let node = NodeRuntime::start(config).unwrap();
            assert_eq!(node.manager().tip(), tip);
            assert_eq!(node.manager().get_block(&blocks[0].hash()).unwrap(), Some(blocks[0].clone()));
            node.shutdown().await;
        }
    }
}
