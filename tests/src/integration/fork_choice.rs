//! # Fork Choice
//!
//! Heaviest cumulative difficulty wins; equal weight never moves the tip;
//! no reorg may reach below the rollback limit.

#[cfg(test)]
mod tests {
    use node_runtime::BlockOutcome;
    use shared_bus::{ChainEvent, EventFilter, EventTopic};

    use crate::fixtures::*;

    // =============================================================================
    // REORGANIZATION
    // =============================================================================

    #[test]
    fn test_heavier_branch_reorgs_and_restores_transactions() {
        let m = new_manager();
        let g = m.tip().hash;

        let tx = transfer(USER, 1, g, 500);
        m.submit_transaction(tx.clone()).unwrap();
        let b1 = m.assemble_block(&keypair(VALIDATOR_A), T0 + 60);
        assert_eq!(b1.transactions, vec![tx.clone()]);
        assert_eq!(
            m.submit_block(b1.clone()).unwrap(),
            BlockOutcome::Extended { height: 1 }
        );
        assert!(!m.pool_contains(&tx.hash()));
        assert_eq!(m.account(&pk(RECIPIENT)).balance, 500);

        let fork = build_branch(g, 1, 2, VALIDATOR_B, 5);
        assert_eq!(
            m.submit_block(fork[0].clone()).unwrap(),
            BlockOutcome::StoredAsSide { height: 1 }
        );
        assert_eq!(m.tip().hash, b1.hash());

        let mut events = m.subscribe(EventFilter::all());
        assert_eq!(
            m.submit_block(fork[1].clone()).unwrap(),
            BlockOutcome::Reorganized {
                height: 2,
                depth: 1
            }
        );
        assert_eq!(m.tip().hash, fork[1].hash());
        assert_eq!(m.account(&pk(RECIPIENT)).balance, 0);
        assert_eq!(m.account(&pk(USER)).sequence, 0);
        assert!(m.pool_contains(&tx.hash()));

        let events: Vec<ChainEvent> = events.drain().into_iter().map(|e| e.event).collect();
        assert_eq!(events.len(), 4);
        assert_eq!(
            events[0],
            ChainEvent::BlockDisconnected {
                hash: b1.hash(),
                height: 1
            }
        );
        assert_eq!(
            events[1],
            ChainEvent::BlockConnected {
                hash: fork[0].hash(),
                height: 1
            }
        );
        assert_eq!(
            events[2],
            ChainEvent::BlockConnected {
                hash: fork[1].hash(),
                height: 2
            }
        );
        assert!(matches!(
            &events[3],
            ChainEvent::TipChanged { old, new, reorg_depth: 1 }
                if old.hash == b1.hash() && new.hash == fork[1].hash()
        ));
    }

    #[test]
    fn test_restored_transaction_confirms_on_new_branch() {
        let m = new_manager();
        let g = m.tip().hash;
        let tx = transfer(USER, 1, g, 700);
        m.submit_block(block_with(g, 1, VALIDATOR_A, vec![tx.clone()]))
            .unwrap();

        for block in build_branch(g, 1, 2, VALIDATOR_B, 5) {
            m.submit_block(block).unwrap();
        }
        assert!(m.pool_contains(&tx.hash()));

        let b3 = m.assemble_block(&keypair(VALIDATOR_B), T0 + 60 * 3 + 5);
        assert_eq!(b3.transactions, vec![tx.clone()]);
        m.submit_block(b3).unwrap();
        assert!(!m.pool_contains(&tx.hash()));
        assert_eq!(m.account(&pk(RECIPIENT)).balance, 700);
    }

    #[test]
    fn test_reorg_within_rollback_limit() {
        let m = new_manager();
        let g = m.tip().hash;
        let main = build_branch(g, 1, 10, VALIDATOR_A, 0);
        for block in &main {
            m.submit_block(block.clone()).unwrap();
        }
        let limit = m.params().rollback_limit;
        assert_eq!(m.finalized_height(), 10 - limit);

        // Fork off b5: five blocks disconnected, within the limit.
        let fork = build_branch(main[4].hash(), 6, 6, VALIDATOR_B, 1);
        let mut last = None;
        for block in &fork {
            last = Some(m.submit_block(block.clone()).unwrap());
        }
        assert_eq!(
            last,
            Some(BlockOutcome::Reorganized {
                height: 11,
                depth: 5
            })
        );
        assert_eq!(m.tip().hash, fork[5].hash());
        assert_eq!(m.active_hash_at(5), Some(main[4].hash()));
        assert_eq!(m.active_hash_at(6), Some(fork[0].hash()));
        assert!(!m.entry(&main[9].hash()).unwrap().is_active());
    }

    // =============================================================================
    // STABILITY
    // =============================================================================

    #[test]
    fn test_equal_weight_forks_do_not_oscillate() {
        let g = test_genesis().hash();
        let a = build_branch(g, 1, 3, VALIDATOR_A, 0);
        let b = build_branch(g, 1, 3, VALIDATOR_B, 0);

        let m = new_manager();
        let mut tips = m.subscribe(EventFilter::topics(vec![EventTopic::Tip]));
        for (x, y) in a.iter().zip(&b) {
            assert!(matches!(
                m.submit_block(x.clone()).unwrap(),
                BlockOutcome::Extended { .. }
            ));
            assert!(matches!(
                m.submit_block(y.clone()).unwrap(),
                BlockOutcome::StoredAsSide { .. }
            ));
        }
        assert_eq!(m.tip().hash, a[2].hash());
        assert_eq!(tips.drain().len(), 3);

        // Arrival order decides between equal branches.
        let other = new_manager();
        for (x, y) in a.iter().zip(&b) {
            other.submit_block(y.clone()).unwrap();
            other.submit_block(x.clone()).unwrap();
        }
        assert_eq!(other.tip().hash, b[2].hash());
    }

    #[test]
    fn test_deep_fork_never_displaces_tip() {
        let m = new_manager();
        let g = m.tip().hash;
        let main = build_branch(g, 1, 10, VALIDATOR_A, 0);
        for block in &main {
            m.submit_block(block.clone()).unwrap();
        }
        let tip = m.tip();
        let finalized = m.finalized_height();

        // Fork off b1, below the finalized height, and much longer.
        let fork = build_branch(main[0].hash(), 2, 14, VALIDATOR_B, 3);
        for block in &fork {
            if let Ok(outcome) = m.submit_block(block.clone()) {
                assert!(!outcome.is_indexed(), "{outcome:?}");
            }
        }

        assert_eq!(m.tip(), tip);
        assert_eq!(m.finalized_height(), finalized);
        assert!(fork.iter().all(|b| !m.contains_block(&b.hash())));
        assert!(!m.is_halted());
    }

    #[test]
    fn test_cumulative_difficulty_is_monotonic() {
        let m = new_manager();
        let g = m.tip().hash;
        for block in build_branch(g, 1, 12, VALIDATOR_A, 0) {
            m.submit_block(block).unwrap();
        }

        let mut previous = m.entry(&g).unwrap();
        for height in 1..=12 {
            let hash = m.active_hash_at(height).unwrap();
            let entry = m.entry(&hash).unwrap();
            assert_eq!(entry.parent_hash, previous.hash);
            assert_eq!(
                entry.cumulative_difficulty,
                previous.cumulative_difficulty + entry.difficulty as u128
            );
            assert!(entry.cumulative_difficulty > previous.cumulative_difficulty);
            previous = entry;
        }
        assert_eq!(m.tip().cumulative_difficulty, previous.cumulative_difficulty);
    }
}
