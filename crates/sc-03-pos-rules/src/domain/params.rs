//! # Protocol Parameters
//!
//! Every consensus constant in one struct. Two nodes with different
//! `ProtocolParams` are on different networks.

use serde::{Deserialize, Serialize};

use crate::domain::errors::ParamsError;

/// Consensus constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolParams {
    /// Block interval the retarget aims for.
    pub target_block_time_secs: u64,
    /// Number of recent blocks fed to the retarget.
    pub difficulty_window: usize,
    /// Difficulty used until the window has two entries.
    pub genesis_difficulty: u64,
    /// Difficulty floor.
    pub min_difficulty: u64,
    /// Median window for the block size limit. Must be odd.
    pub block_size_window: usize,
    pub default_min_block_size: u64,
    pub default_max_block_size: u64,
    /// Multiplier applied to the median block size.
    pub block_size_scale: u64,
    /// Blocks before stake and rewards become spendable.
    pub maturity: u64,
    /// Deepest reorg the chain index will perform.
    pub rollback_limit: u64,
    /// Blocks of run before a protocol upgrade activates.
    pub upgrade_threshold: u64,
    /// How far ahead of the local clock a header timestamp may be.
    pub max_future_drift_secs: u64,
    /// How many recent blocks a transaction reference may point into.
    pub anchor_window: u64,
    /// Fee units per 256 bytes.
    pub min_fee_rate: u64,
    /// Minted to each block proposer.
    pub block_reward: u64,
    pub max_tx_size: usize,
    pub max_code_size: usize,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            target_block_time_secs: 60,
            difficulty_window: 30,
            genesis_difficulty: 1_000_000,
            min_difficulty: 1,
            block_size_window: 101,
            default_min_block_size: 64 * 1024,
            default_max_block_size: 1_000_000,
            block_size_scale: 2,
            maturity: 10,
            rollback_limit: 60,
            upgrade_threshold: 100,
            max_future_drift_secs: 15,
            anchor_window: 60,
            min_fee_rate: 100_000,
            block_reward: 5_000_000,
            max_tx_size: 64 * 1024,
            max_code_size: 24 * 1024,
        }
    }
}

impl ProtocolParams {
    /// Small windows and short maturity for tests.
    pub fn for_testing() -> Self {
        Self {
            difficulty_window: 5,
            genesis_difficulty: 1_000,
            block_size_window: 5,
            maturity: 2,
            rollback_limit: 6,
            upgrade_threshold: 10,
            anchor_window: 20,
            min_fee_rate: 1_000,
            block_reward: 50,
            ..Self::default()
        }
    }

    /// Check the orderings and ranges the rules depend on.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.maturity > self.upgrade_threshold {
            return Err(ParamsError::MaturityExceedsUpgradeThreshold {
                maturity: self.maturity,
                upgrade_threshold: self.upgrade_threshold,
            });
        }
        if self.rollback_limit > self.upgrade_threshold {
            return Err(ParamsError::RollbackExceedsUpgradeThreshold {
                rollback_limit: self.rollback_limit,
                upgrade_threshold: self.upgrade_threshold,
            });
        }
        if self.block_size_window % 2 == 0 {
            return Err(ParamsError::BlockSizeWindowNotOdd(self.block_size_window));
        }
        if self.target_block_time_secs == 0 {
            return Err(out_of_range("target_block_time_secs", "must be positive"));
        }
        if self.difficulty_window < 2 {
            return Err(out_of_range("difficulty_window", "needs at least 2 entries"));
        }
        if self.min_difficulty == 0 {
            return Err(out_of_range(
                "min_difficulty",
                "zero would let cumulative difficulty stall",
            ));
        }
        if self.genesis_difficulty < self.min_difficulty {
            return Err(out_of_range("genesis_difficulty", "below min_difficulty"));
        }
        if self.default_min_block_size > self.default_max_block_size {
            return Err(out_of_range(
                "default_min_block_size",
                "exceeds default_max_block_size",
            ));
        }
        if self.block_size_scale == 0 {
            return Err(out_of_range("block_size_scale", "must be positive"));
        }
        if self.max_tx_size as u64 > self.default_min_block_size {
            return Err(out_of_range(
                "max_tx_size",
                "a maximal transaction must fit the smallest block",
            ));
        }
        if self.anchor_window == 0 {
            return Err(out_of_range("anchor_window", "must be positive"));
        }
        Ok(())
    }
}

fn out_of_range(name: &'static str, reason: &str) -> ParamsError {
    ParamsError::OutOfRange {
        name,
        reason: reason.to_string(),
    }
}
