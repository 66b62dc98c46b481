//! # Pool Consistency
//!
//! The pool only ever holds transactions that apply on the active tip:
//! confirmed entries leave, replays are refused, conflicting entries are
//! evicted with a notification, and a failed block changes nothing.

#[cfg(test)]
mod tests {
    use node_runtime::{BlockOutcome, NodeError};
    use sc_02_ledger::RejectReason;
    use sc_04_block_validator::ValidationError;
    use sc_06_txpool::{Admission, PoolError};
    use shared_bus::{ChainEvent, EventFilter, EventTopic};
    use shared_types::Block;

    use crate::fixtures::*;

    // =============================================================================
    // CONFIRMATION AND REPLAY
    // =============================================================================

    #[test]
    fn test_confirmed_transactions_leave_pool() {
        let m = new_manager();
        let g = m.tip().hash;
        let txs: Vec<_> = (1..=3).map(|seq| transfer(USER, seq, g, 100 * seq)).collect();
        for tx in &txs {
            assert_eq!(
                m.submit_transaction(tx.clone()).unwrap(),
                Admission::Added { evicted: vec![] }
            );
        }
        assert_eq!(m.pool_len(), 3);

        let block = m.assemble_block(&keypair(VALIDATOR_A), T0 + 60);
        assert_eq!(block.transactions, txs);
        m.submit_block(block).unwrap();

        assert_eq!(m.pool_len(), 0);
        assert_eq!(m.account(&pk(USER)).sequence, 3);
        assert_eq!(m.account(&pk(RECIPIENT)).balance, 600);
    }

    #[test]
    fn test_replay_rejected_after_confirmation() {
        let m = new_manager();
        let g = m.tip().hash;
        let tx = transfer(USER, 1, g, 100);
        let b1 = block_with(g, 1, VALIDATOR_A, vec![tx.clone()]);
        m.submit_block(b1.clone()).unwrap();

        assert_eq!(
            m.submit_transaction(tx.clone()).unwrap_err(),
            NodeError::Pool(PoolError::Rejected(RejectReason::BadSequence {
                expected: 2,
                got: 1
            }))
        );

        let replay = block_with(b1.hash(), 2, VALIDATOR_A, vec![tx.clone()]);
        assert!(matches!(
            m.submit_block(replay).unwrap_err(),
            NodeError::Validation(ValidationError::Transaction {
                index: 0,
                reason: RejectReason::BadSequence { .. },
                ..
            })
        ));
        assert_eq!(m.tip().hash, b1.hash());
    }

    #[test]
    fn test_duplicate_admission_is_a_no_op() {
        let m = new_manager();
        let tx = transfer(USER, 1, m.tip().hash, 100);
        m.submit_transaction(tx.clone()).unwrap();
        assert_eq!(m.submit_transaction(tx).unwrap(), Admission::AlreadyPooled);
        assert_eq!(m.pool_len(), 1);
    }

    #[test]
    fn test_second_transaction_for_sequence_refused() {
        let m = new_manager();
        let g = m.tip().hash;
        let first = transfer(USER, 1, g, 100);
        m.submit_transaction(first.clone()).unwrap();

        assert_eq!(
            m.submit_transaction(transfer(USER, 1, g, 200)).unwrap_err(),
            NodeError::Pool(PoolError::SequenceTaken {
                sequence: 1,
                existing: first.hash()
            })
        );
    }

    // =============================================================================
    // FEES AND CAPACITY
    // =============================================================================

    #[test]
    fn test_fee_floor() {
        let mut config = test_config();
        config.chain.min_fee_rate = 100_000;
        let m = new_manager_with(config);
        assert!(m.check_fee(184, 100_000));
        assert!(!m.check_fee(1_000, 100_000));

        let cheap = new_manager();
        let tx = transfer_with_fee(USER, 1, cheap.tip().hash, 100, 1);
        assert!(matches!(
            cheap.submit_transaction(tx).unwrap_err(),
            NodeError::Pool(PoolError::Rejected(RejectReason::FeeBelowFloor { fee: 1, .. }))
        ));
        assert_eq!(cheap.pool_len(), 0);
    }

    #[test]
    fn test_full_pool_evicts_lowest_fee_rate() {
        let g = test_genesis().hash();
        let low = transfer_with_fee(USER, 1, g, 100, 10_000);
        let mid = transfer_with_fee(VALIDATOR_A, 1, g, 100, 20_000);
        let high = transfer_with_fee(VALIDATOR_B, 1, g, 100, 30_000);

        let mut config = test_config();
        config.txpool.max_bytes = low.encoded_size() + mid.encoded_size();
        let m = new_manager_with(config);
        let mut evictions = m.subscribe(EventFilter::topics(vec![EventTopic::TxPool]));

        m.submit_transaction(low.clone()).unwrap();
        m.submit_transaction(mid.clone()).unwrap();
        assert_eq!(
            m.submit_transaction(high.clone()).unwrap(),
            Admission::Added {
                evicted: vec![low.hash()]
            }
        );
        assert!(!m.pool_contains(&low.hash()));
        assert_eq!(
            evictions.drain().into_iter().map(|e| e.event).collect::<Vec<_>>(),
            vec![ChainEvent::TransactionsEvicted {
                hashes: vec![low.hash()]
            }]
        );

        // Nothing cheaper left to evict.
        let cheaper = transfer_with_fee(USER, 1, g, 100, 5_000);
        assert!(matches!(
            m.submit_transaction(cheaper).unwrap_err(),
            NodeError::Pool(PoolError::PoolFull { .. })
        ));
        assert_eq!(m.pool_len(), 2);
    }

    // =============================================================================
    // CHAIN UPDATES
    // =============================================================================

    #[test]
    fn test_conflicting_transaction_evicted_on_commit() {
        let m = new_manager();
        let g = m.tip().hash;
        let pooled = transfer(USER, 1, g, 100);
        m.submit_transaction(pooled.clone()).unwrap();
        let mut evictions = m.subscribe(EventFilter::topics(vec![EventTopic::TxPool]));

        // Same sender and sequence, different payload, mined directly.
        let conflicting = transfer(USER, 1, g, 250);
        m.submit_block(block_with(g, 1, VALIDATOR_A, vec![conflicting]))
            .unwrap();

        assert!(!m.pool_contains(&pooled.hash()));
        assert_eq!(
            evictions.drain().into_iter().map(|e| e.event).collect::<Vec<_>>(),
            vec![ChainEvent::TransactionsEvicted {
                hashes: vec![pooled.hash()]
            }]
        );
    }

    #[test]
    fn test_failed_block_changes_nothing() {
        let m = new_manager();
        let g = m.tip().hash;
        let pooled = transfer(USER, 1, g, 100);
        m.submit_transaction(pooled.clone()).unwrap();
        let tip = m.tip();
        let digest = m.tip_state().digest();

        // First transfer applies, the second overspends.
        let good = transfer(VALIDATOR_B, 1, g, 100);
        let overspend = transfer(VALIDATOR_B, 2, g, 2 * VALIDATOR_STAKE);
        let block = block_with(g, 1, VALIDATOR_A, vec![good, overspend]);
        let err = m.submit_block(block.clone()).unwrap_err();
        assert!(matches!(
            err,
            NodeError::Validation(ValidationError::Transaction {
                index: 1,
                reason: RejectReason::InsufficientFunds { .. },
                ..
            })
        ));

        assert_eq!(m.tip(), tip);
        assert_eq!(m.tip_state().digest(), digest);
        assert_eq!(m.account(&pk(VALIDATOR_B)).sequence, 0);
        assert!(!m.contains_block(&block.hash()));
        assert_eq!(m.pool_hashes(), vec![pooled.hash()]);

        // The same bytes stay rejected; a good block still extends.
        assert_eq!(m.submit_block(block).unwrap_err(), err);
        assert_eq!(
            m.submit_block(Block::propose(g, T0 + 60, vec![], &keypair(VALIDATOR_A)))
                .unwrap(),
            BlockOutcome::Extended { height: 1 }
        );
    }
}
