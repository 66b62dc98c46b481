//! Shared keys, genesis and builders for the integration suites.
//!
//! Every chain starts from the same genesis: two staked validators and one
//! funded user, so branches built by either validator are always eligible
//! under the test difficulty.

use std::sync::Arc;

use node_runtime::genesis::GenesisAllocation;
use node_runtime::{ChainManager, Genesis, GenesisBuilder, GenesisConfig, NodeConfig};
use parking_lot::Mutex;
use sc_01_storage::{BatchOperation, InMemoryKVStore, KVStoreError, KeyValueStore, ScanResult};
use sc_03_pos_rules::ProtocolParams;
use shared_crypto::Ed25519KeyPair;
use shared_types::{Block, Hash, PublicKey, Transaction, TxBody, TxPayload};

/// Genesis timestamp. Block at height `h` is stamped `T0 + 60 * h`.
pub const T0: u64 = 1_700_000_000;

pub const VALIDATOR_A: u8 = 1;
pub const VALIDATOR_B: u8 = 2;
pub const USER: u8 = 3;
pub const RECIPIENT: u8 = 9;

pub const VALIDATOR_STAKE: u64 = 1_000_000_000;
pub const USER_BALANCE: u64 = 10_000_000;
pub const TX_FEE: u64 = 10_000;

pub fn keypair(seed: u8) -> Ed25519KeyPair {
    Ed25519KeyPair::from_seed([seed; 32])
}

pub fn pk(seed: u8) -> PublicKey {
    *keypair(seed).public_key().as_bytes()
}

pub fn test_config() -> NodeConfig {
    NodeConfig {
        chain: ProtocolParams::for_testing(),
        genesis: test_genesis_config(),
        ..NodeConfig::default()
    }
}

pub fn test_genesis_config() -> GenesisConfig {
    let alloc = |seed: u8, balance: u64, stake: u64| GenesisAllocation {
        key: hex::encode(pk(seed)),
        balance,
        stake,
    };
    GenesisConfig {
        timestamp: T0,
        allocations: vec![
            alloc(VALIDATOR_A, VALIDATOR_STAKE, VALIDATOR_STAKE),
            alloc(VALIDATOR_B, VALIDATOR_STAKE, VALIDATOR_STAKE),
            alloc(USER, USER_BALANCE, 0),
        ],
    }
}

pub fn test_genesis() -> Genesis {
    GenesisBuilder::new(test_genesis_config())
        .build()
        .expect("test genesis is valid")
}

/// Manager over a fresh in-memory store.
pub fn new_manager() -> ChainManager {
    new_manager_with(test_config())
}

pub fn new_manager_with(config: NodeConfig) -> ChainManager {
    ChainManager::open(Box::new(InMemoryKVStore::new()), &config, &test_genesis())
        .expect("open manager")
}

/// Signed transfer of `amount` from `seed` to the recipient.
pub fn transfer(seed: u8, sequence: u64, reference: Hash, amount: u64) -> Transaction {
    transfer_with_fee(seed, sequence, reference, amount, TX_FEE)
}

pub fn transfer_with_fee(
    seed: u8,
    sequence: u64,
    reference: Hash,
    amount: u64,
    fee: u64,
) -> Transaction {
    let kp = keypair(seed);
    Transaction::sign(
        TxBody {
            sender: *kp.public_key().as_bytes(),
            sequence,
            reference,
            fee,
            payload: TxPayload::Transfer {
                to: pk(RECIPIENT),
                amount,
            },
        },
        &kp,
    )
}

/// `n` empty blocks on `parent`, the first at `start_height`. `offset` shifts
/// every timestamp so branches from different proposers never collide.
pub fn build_branch(
    parent: Hash,
    start_height: u64,
    n: u64,
    proposer: u8,
    offset: u64,
) -> Vec<Block> {
    let kp = keypair(proposer);
    let mut parent = parent;
    (start_height..start_height + n)
        .map(|h| {
            let block = Block::propose(parent, T0 + 60 * h + offset, Vec::new(), &kp);
            parent = block.hash();
            block
        })
        .collect()
}

/// A single block at `height` carrying `txs`.
pub fn block_with(
    parent: Hash,
    height: u64,
    proposer: u8,
    txs: Vec<Transaction>,
) -> Block {
    Block::propose(parent, T0 + 60 * height, txs, &keypair(proposer))
}

/// Store handle that survives its manager, for restart tests.
#[derive(Clone, Default)]
pub struct SharedStore(Arc<Mutex<InMemoryKVStore>>);

impl SharedStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for SharedStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        self.0.lock().get(key)
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.0.lock().put(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError> {
        self.0.lock().delete(key)
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        self.0.lock().atomic_batch_write(operations)
    }

    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        self.0.lock().exists(key)
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, KVStoreError> {
        self.0.lock().prefix_scan(prefix)
    }
}
