//! # Node Configuration
//!
//! Unified configuration for all subsystems and runtime parameters.
//!
//! Sources, lowest precedence first:
//!
//! 1. Built-in defaults
//! 2. JSON file named by `SC_CONFIG`
//! 3. Individual `SC_*` environment variables
//!
//! Protocol parameters are checked with `ProtocolParams::validate` before the
//! node starts; a violated ordering refuses startup.

use std::path::PathBuf;
use std::str::FromStr;

use sc_03_pos_rules::{ParamsError, ProtocolParams};
use sc_06_txpool::TxPoolConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::genesis::GenesisConfig;

/// Complete node configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Consensus constants.
    pub chain: ProtocolParams,
    pub txpool: TxPoolConfig,
    pub storage: StorageConfig,
    pub runtime: RuntimeConfig,
    pub genesis: GenesisConfig,
}

impl NodeConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load using `lookup` for environment variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup("SC_CONFIG") {
            Some(path) => Self::from_file(PathBuf::from(path))?,
            None => Self::default(),
        };
        config.apply_overrides(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: PathBuf) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chain.validate()?;
        if self.runtime.intake_capacity == 0 {
            return Err(ConfigError::Invalid("runtime.intake_capacity must be positive".into()));
        }
        if self.runtime.validation_workers == 0 {
            return Err(ConfigError::Invalid(
                "runtime.validation_workers must be positive".into(),
            ));
        }
        if self.txpool.max_bytes < self.chain.max_tx_size {
            return Err(ConfigError::Invalid(
                "txpool.max_bytes cannot hold a maximal transaction".into(),
            ));
        }
        Ok(())
    }

    fn apply_overrides<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("SC_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(backend) = lookup("SC_STORAGE_BACKEND") {
            self.storage.backend = backend.parse()?;
        }
        override_value(lookup, "SC_TXPOOL_SIZE", &mut self.txpool.max_bytes)?;
        override_value(lookup, "SC_MIN_FEE_RATE", &mut self.chain.min_fee_rate)?;
        override_value(lookup, "SC_ROLLBACK_LIMIT", &mut self.chain.rollback_limit)?;
        override_value(lookup, "SC_MATURITY", &mut self.chain.maturity)?;
        override_value(lookup, "SC_INTAKE_CAPACITY", &mut self.runtime.intake_capacity)?;
        Ok(())
    }
}

fn override_value<F, T>(lookup: &F, var: &'static str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(var) {
        *target = raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value: raw })?;
    }
    Ok(())
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed config file: {0}")]
    Parse(String),

    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("unknown storage backend {0:?} (expected \"memory\" or \"rocksdb\")")]
    UnknownBackend(String),

    #[error("protocol parameters: {0}")]
    Params(#[from] ParamsError),

    #[error("{0}")]
    Invalid(String),
}

/// Which key-value store backs the node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Nothing survives a restart.
    #[default]
    Memory,
    /// Requires the `rocksdb` feature.
    RocksDb,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "rocksdb" => Ok(StorageBackend::RocksDb),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Data directory for the persistent backend.
    pub data_dir: PathBuf,
    pub backend: StorageBackend,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            backend: StorageBackend::Memory,
        }
    }
}

/// Intake and worker settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Bounded queue of inbound blocks and transactions.
    pub intake_capacity: usize,
    /// Blocks validated concurrently.
    pub validation_workers: usize,
    /// Remembered structural rejections.
    pub reject_cache_size: usize,
    /// Blocks parked while their parent is missing. Also bounds blocks
    /// deferred for a timestamp ahead of the local clock.
    pub orphan_limit: usize,
    /// Seconds between retries of deferred blocks.
    pub deferred_retry_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            intake_capacity: 1024,
            validation_workers: 4,
            reject_cache_size: 4096,
            orphan_limit: 512,
            deferred_retry_secs: 5,
        }
    }
}
