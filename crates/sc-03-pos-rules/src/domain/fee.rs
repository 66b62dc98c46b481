//! # Fee Floor
//!
//! Fee rate is fee units per `FEE_SIZE_QUANTUM` bytes. All comparisons are
//! exact cross-multiplications in `u128`; no division, no rounding.

use std::cmp::Ordering;

/// Bytes per fee-rate unit.
pub const FEE_SIZE_QUANTUM: u64 = 256;

/// Whether `amount` paid for `size` bytes meets `min_fee_rate`.
///
/// `amount * 256 >= min_fee_rate * size`
pub fn check_fee(size: u64, amount: u64, min_fee_rate: u64) -> bool {
    amount as u128 * FEE_SIZE_QUANTUM as u128 >= min_fee_rate as u128 * size as u128
}

/// A fee over a size, ordered by rate.
#[derive(Debug, Clone, Copy)]
pub struct FeeRate {
    pub fee: u64,
    pub size: u64,
}

impl FeeRate {
    pub fn new(fee: u64, size: u64) -> Self {
        Self {
            fee,
            size: size.max(1),
        }
    }

    /// Rate in fee units per quantum, rounded down. For logs.
    pub fn per_quantum(&self) -> u64 {
        (self.fee as u128 * FEE_SIZE_QUANTUM as u128 / self.size as u128) as u64
    }
}

impl PartialEq for FeeRate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FeeRate {}

impl PartialOrd for FeeRate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FeeRate {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.fee as u128 * other.size as u128;
        let rhs = other.fee as u128 * self.size as u128;
        lhs.cmp(&rhs)
    }
}
