//! # Ledger Subsystem (sc-02)
//!
//! Account and stake state, and the only code that changes it.
//!
//! ## Responsibilities
//!
//! - Snapshot reads: [`Ledger::open`] / [`Ledger::open_at`] return an
//!   immutable [`StateView`] bound to one block.
//! - Transaction application: [`PendingState::apply_transaction`] either
//!   accepts and records the effect in a pending delta set, or rejects with
//!   a [`RejectReason`] and changes nothing.
//! - Commit and undo: [`Ledger::plan_commit`] produces one atomic batch for
//!   a whole disconnect/connect path; [`Ledger::apply_commit`] swaps memory
//!   after the batch is durable.
//! - Finality: layers deeper than the rollback limit are folded into the
//!   base and can no longer be disconnected.
//!
//! ## Numeric Semantics
//!
//! Amounts are `u64`. Every addition and subtraction is checked; overflow
//! is `RejectReason::Overflow`, never wraparound.

pub mod domain;
pub mod service;

pub use domain::account::{contract_address, Account, LockedFunds};
pub use domain::errors::{LedgerError, RejectReason};
pub use domain::layers::{StateDelta, UndoRecord};
pub use domain::pending::{PendingState, Receipt, TxOutcome};
pub use domain::rules::{check_anchor, check_standalone};
pub use domain::view::StateView;
pub use service::{Ledger, LedgerCommit};
