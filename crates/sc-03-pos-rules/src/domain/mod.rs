//! Domain layer for the PoS rules.

pub mod block_size;
pub mod difficulty;
pub mod eligibility;
pub mod errors;
pub mod fee;
pub mod params;
