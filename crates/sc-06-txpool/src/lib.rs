//! # Transaction Pool Subsystem (sc-06)
//!
//! Holds valid, unconfirmed transactions and hands them to block assembly.
//!
//! ## Admission
//!
//! | Check | Failure |
//! |-------|---------|
//! | Already pooled | accepted, no-op |
//! | Size and fee floor | `Rejected(Oversized / FeeBelowFloor)` |
//! | Reference is a recent ancestor of the tip | `Rejected(BadAnchor)` |
//! | Sequence not already pooled | `SequenceTaken` |
//! | Applies on the tip after the sender's earlier pooled txs | `Rejected(reason)` |
//! | Fits in the byte cap, evicting only strictly lower fee rates | `PoolFull` |
//!
//! ## Chain Updates
//!
//! After a commit the pool drops confirmed hashes and revalidates every
//! remaining entry against the new tip. After a reorg, transactions from
//! disconnected blocks are offered back through the same admission path.

pub mod domain;
pub mod service;

pub use domain::entities::{Admission, PooledTx, PriorityKey, TxPoolConfig};
pub use domain::errors::PoolError;
pub use domain::pool::PoolIndex;
pub use service::TxPool;
