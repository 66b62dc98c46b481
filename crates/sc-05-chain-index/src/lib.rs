//! # Chain Index Subsystem (sc-05)
//!
//! Owns the height-to-block mapping and the notion of "best chain".
//!
//! ## Fork Choice
//!
//! | Candidate | Outcome |
//! |-----------|---------|
//! | Parent is the tip | `Extend` |
//! | Other branch, cumulative difficulty strictly greater | `Reorg` |
//! | Other branch, equal or lower | `StoredAsSide` |
//! | Fork point deeper than `rollback_limit` | `ReorgTooDeep` |
//!
//! Equal cumulative difficulty never switches the tip, so two equally
//! weighted forks cannot make the tip oscillate.
//!
//! ## Persisted Layout
//!
//! | Key | Value |
//! |-----|-------|
//! | `b:{hash}` | CRC32-framed `Block` |
//! | `x:{hash}` | `BlockHeader` |
//! | `e:{hash}` | `BlockIndexEntry` |
//! | `h:{height}` | active block hash |
//! | `m:tip` | `ChainTip` |

pub mod domain;
pub mod service;

pub use domain::errors::ChainError;
pub use domain::fork_choice::ForkChoice;
pub use service::{ChainCommit, ChainIndex};
