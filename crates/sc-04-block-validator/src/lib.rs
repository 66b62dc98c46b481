//! # Block Validator Subsystem (sc-04)
//!
//! Validates one block against its parent's chain and ledger state.
//!
//! ## Stages
//!
//! | Stage reached | Checks passed |
//! |---------------|---------------|
//! | `HeaderChecked` | version, parent known, timestamp after parent and within drift, content root, proposer signature |
//! | `EligibilityChecked` | PoS kernel threshold with stake from the parent state |
//! | `TransactionsApplied` | block size limit, per-tx size/fee/anchor, sequential ledger application |
//! | `Accepted` | all of the above |
//!
//! Nothing here writes state. The result of a successful validation is a
//! [`ValidatedBlock`] carrying its index entry and state delta; the caller
//! decides whether and where to commit it.
//!
//! ## Rejections
//!
//! Permanent rejections are cached by `Block::witness_hash`, which covers
//! every signature, and returned as-is when the same bytes arrive again. Transient ones (unknown parent, missing parent state,
//! future timestamp) are not cached and may be retried.

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::context::{BlockContext, ValidatedBlock};
pub use domain::errors::ValidationError;
pub use domain::stage::ValidationStage;
pub use ports::{SystemTimeSource, TimeSource};
pub use service::{BlockValidator, ValidatorConfig};
