//! Protocol parameter errors.

use shared_types::{Classify, ErrorClass};
use thiserror::Error;

/// A protocol constant ordering or range is violated. Detected at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamsError {
    #[error("maturity ({maturity}) exceeds upgrade threshold ({upgrade_threshold})")]
    MaturityExceedsUpgradeThreshold { maturity: u64, upgrade_threshold: u64 },

    #[error("rollback limit ({rollback_limit}) exceeds upgrade threshold ({upgrade_threshold})")]
    RollbackExceedsUpgradeThreshold {
        rollback_limit: u64,
        upgrade_threshold: u64,
    },

    #[error("block size window must be odd and non-zero, got {0}")]
    BlockSizeWindowNotOdd(usize),

    #[error("invalid parameter {name}: {reason}")]
    OutOfRange { name: &'static str, reason: String },
}

impl Classify for ParamsError {
    fn class(&self) -> ErrorClass {
        ErrorClass::Permanent
    }
}
