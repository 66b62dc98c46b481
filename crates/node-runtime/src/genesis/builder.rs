//! # Genesis Block Builder
//!
//! Creates the genesis block and its initial account allocations.

use std::collections::BTreeMap;

use sc_02_ledger::Account;
use serde::{Deserialize, Serialize};
use shared_crypto::Ed25519KeyPair;
use shared_types::{Block, Hash, PublicKey};
use thiserror::Error;

/// Genesis creation errors.
#[derive(Debug, Error)]
pub enum GenesisError {
    /// Invalid genesis configuration.
    #[error("Invalid genesis configuration: {0}")]
    InvalidConfig(String),

    /// A public key in the allocation list is not 32 hex-encoded bytes.
    #[error("Invalid public key {key}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// The same key appears twice.
    #[error("Duplicate allocation for key {0}")]
    DuplicateKey(String),
}

/// One funded account at genesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAllocation {
    /// Hex-encoded Ed25519 public key.
    pub key: String,
    #[serde(default)]
    pub balance: u64,
    /// Bonded stake, mature from height 0.
    #[serde(default)]
    pub stake: u64,
}

/// Genesis block configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisConfig {
    /// Genesis timestamp (Unix seconds). Part of the genesis hash.
    pub timestamp: u64,
    pub allocations: Vec<GenesisAllocation>,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            timestamp: 1_700_000_000,
            allocations: Vec::new(),
        }
    }
}

impl GenesisConfig {
    /// Single-validator chain for local development.
    pub fn devnet(validator: &PublicKey) -> Self {
        Self {
            allocations: vec![GenesisAllocation {
                key: hex::encode(validator),
                balance: 1_000_000_000,
                stake: 1_000_000_000,
            }],
            ..Default::default()
        }
    }

    /// Deterministic development validator key.
    pub fn devnet_keypair() -> Ed25519KeyPair {
        Ed25519KeyPair::from_seed([0x5c; 32])
    }
}

/// The genesis block and the state it seeds.
#[derive(Debug, Clone)]
pub struct Genesis {
    pub block: Block,
    pub allocations: BTreeMap<PublicKey, Account>,
}

impl Genesis {
    pub fn hash(&self) -> Hash {
        self.block.hash()
    }
}

/// Builder for the genesis block.
pub struct GenesisBuilder {
    config: GenesisConfig,
}

impl GenesisBuilder {
    pub fn new(config: GenesisConfig) -> Self {
        Self { config }
    }

    /// Build the genesis block.
    ///
    /// At least one allocation must carry stake, otherwise no block could
    /// ever be proposed on top of it.
    pub fn build(self) -> Result<Genesis, GenesisError> {
        let mut allocations = BTreeMap::new();
        let mut total_stake: u64 = 0;

        for alloc in &self.config.allocations {
            let key = parse_key(&alloc.key)?;
            if allocations.contains_key(&key) {
                return Err(GenesisError::DuplicateKey(alloc.key.clone()));
            }
            total_stake = total_stake
                .checked_add(alloc.stake)
                .ok_or_else(|| GenesisError::InvalidConfig("total stake overflows".into()))?;
            allocations.insert(
                key,
                Account {
                    balance: alloc.balance,
                    stake: alloc.stake,
                    ..Account::default()
                },
            );
        }

        if total_stake == 0 {
            return Err(GenesisError::InvalidConfig(
                "no allocation carries stake".into(),
            ));
        }

        Ok(Genesis {
            block: Block::genesis(self.config.timestamp),
            allocations,
        })
    }
}

fn parse_key(key: &str) -> Result<PublicKey, GenesisError> {
    let bytes = hex::decode(key).map_err(|e| GenesisError::InvalidKey {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    PublicKey::try_from(bytes.as_slice()).map_err(|_| GenesisError::InvalidKey {
        key: key.to_string(),
        reason: format!("expected 32 bytes, got {}", bytes.len()),
    })
}
