//! # StakeChain Core Benchmarks
//!
//! | Group | Measures |
//! |-------|----------|
//! | `block-commit` | validate and commit a run of blocks on a fresh chain |
//! | `txpool` | admission against the tip, block assembly |
//! | `pos-rules` | difficulty retarget, eligibility kernel |

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use sc_03_pos_rules::{is_eligible, kernel_hash, next_difficulty, DifficultySample, ProtocolParams};
use sc_tests::fixtures::*;
use shared_types::Block;

fn bench_block_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("block-commit");
    group.measurement_time(Duration::from_secs(10));

    let genesis = test_genesis().hash();
    for txs_per_block in [0u64, 10, 40] {
        let mut parent = genesis;
        let mut sequence = 0;
        let blocks: Vec<Block> = (1..=20u64)
            .map(|h| {
                let txs = (0..txs_per_block)
                    .map(|_| {
                        sequence += 1;
                        transfer(USER, sequence, genesis, 1)
                    })
                    .collect();
                let block = block_with(parent, h, VALIDATOR_A, txs);
                parent = block.hash();
                block
            })
            .collect();

        group.throughput(Throughput::Elements(blocks.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("twenty_blocks", txs_per_block),
            &blocks,
            |b, blocks| {
                b.iter(|| {
                    let m = new_manager();
                    for block in blocks {
                        black_box(m.submit_block(block.clone()).is_ok());
                    }
                })
            },
        );
    }
    group.finish();
}

fn bench_txpool(c: &mut Criterion) {
    let mut group = c.benchmark_group("txpool");

    let genesis = test_genesis().hash();
    let txs: Vec<_> = (1..=200u64).map(|seq| transfer(USER, seq, genesis, 1)).collect();

    group.throughput(Throughput::Elements(txs.len() as u64));
    group.bench_function("admit_sender_chain_200", |b| {
        b.iter(|| {
            let m = new_manager();
            for tx in &txs {
                black_box(m.submit_transaction(tx.clone()).is_ok());
            }
        })
    });

    let m = new_manager();
    for tx in &txs {
        let _ = m.submit_transaction(tx.clone());
    }
    let key = keypair(VALIDATOR_A);
    group.bench_function("assemble_block", |b| {
        b.iter(|| black_box(m.assemble_block(&key, T0 + 60)))
    });
    group.finish();
}

fn bench_pos_rules(c: &mut Criterion) {
    let mut group = c.benchmark_group("pos-rules");
    let params = ProtocolParams::default();
    let mut rng = rand::thread_rng();

    let window: Vec<DifficultySample> = (0..params.difficulty_window as u64)
        .map(|i| DifficultySample {
            timestamp: T0 + i * 60 + rng.gen_range(0..30),
            difficulty: rng.gen_range(900_000..1_100_000),
        })
        .collect();
    group.bench_function("next_difficulty", |b| {
        b.iter(|| black_box(next_difficulty(&window, &params)))
    });

    let parent = [7u8; 32];
    let proposer = pk(VALIDATOR_A);
    group.bench_function("kernel_and_eligibility", |b| {
        b.iter(|| {
            let kernel = kernel_hash(&parent, &proposer, T0 + 60);
            black_box(is_eligible(VALIDATOR_STAKE, T0 + 60, T0, 1_000_000, &kernel))
        })
    });
    group.finish();
}

criterion_group!(benches, bench_block_commit, bench_txpool, bench_pos_rules);
criterion_main!(benches);
