//! # PoS Rules Subsystem (sc-03)
//!
//! Pure, stateless consensus rules. Every function takes its inputs
//! explicitly; nothing here reads a clock, a store or a global.
//!
//! | Rule | Function |
//! |------|----------|
//! | Difficulty retarget | [`next_difficulty`] |
//! | Proposer eligibility | [`is_eligible`], [`EligibilityRule`] |
//! | Block size limit | [`max_block_size`] |
//! | Fee floor | [`check_fee`] |
//! | Constant orderings | [`ProtocolParams::validate`] |

pub mod domain;

pub use domain::block_size::max_block_size;
pub use domain::difficulty::{next_difficulty, DifficultySample};
pub use domain::eligibility::{is_eligible, kernel_hash, EligibilityRule, KernelRule};
pub use domain::errors::ParamsError;
pub use domain::fee::{check_fee, FeeRate, FEE_SIZE_QUANTUM};
pub use domain::params::ProtocolParams;
