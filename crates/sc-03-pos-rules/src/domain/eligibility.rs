//! # Proposer Eligibility
//!
//! A proposer may sign a block at `block_time` if its kernel hit is below a
//! target that grows with stake weight and elapsed time:
//!
//! ```text
//! kernel = SHA-256(parent_hash || proposer || block_time_be)
//! hit    = u64::from_be_bytes(kernel[0..8])
//! eligible  <=>  stake_weight * elapsed * 2^64  >  hit * difficulty
//! ```
//!
//! The kernel uses only public data, so anyone can verify it without the
//! proposer's private key. The comparison is strict, and all products are
//! computed in `U256` so nothing overflows.

use primitive_types::U256;
use shared_crypto::sha256_many;
use shared_types::{Hash, PublicKey};

/// Pluggable eligibility threshold.
///
/// Implementations must be deterministic, monotonic in `stake_weight` and
/// verifiable from public inputs.
pub trait EligibilityRule: Send + Sync {
    fn is_eligible(
        &self,
        stake_weight: u64,
        block_time: u64,
        previous_block_time: u64,
        difficulty: u64,
        kernel: &Hash,
    ) -> bool;
}

/// Default rule: the kernel-hit threshold above.
#[derive(Debug, Clone, Copy, Default)]
pub struct KernelRule;

impl EligibilityRule for KernelRule {
    fn is_eligible(
        &self,
        stake_weight: u64,
        block_time: u64,
        previous_block_time: u64,
        difficulty: u64,
        kernel: &Hash,
    ) -> bool {
        is_eligible(stake_weight, block_time, previous_block_time, difficulty, kernel)
    }
}

/// Kernel hash for a proposal.
pub fn kernel_hash(parent_hash: &Hash, proposer: &PublicKey, block_time: u64) -> Hash {
    sha256_many(&[&parent_hash[..], &proposer[..], &block_time.to_be_bytes()])
}

/// The kernel-hit eligibility check.
pub fn is_eligible(
    stake_weight: u64,
    block_time: u64,
    previous_block_time: u64,
    difficulty: u64,
    kernel: &Hash,
) -> bool {
    if stake_weight == 0 || block_time <= previous_block_time {
        return false;
    }
    let elapsed = block_time - previous_block_time;
    let hit = u64::from_be_bytes([
        kernel[0], kernel[1], kernel[2], kernel[3], kernel[4], kernel[5], kernel[6], kernel[7],
    ]);

    let lhs = (U256::from(stake_weight) * U256::from(elapsed)) << 64;
    let rhs = U256::from(hit) * U256::from(difficulty);
    lhs > rhs
}
