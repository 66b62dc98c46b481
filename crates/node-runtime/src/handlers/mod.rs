//! # Handlers
//!
//! Async entry points that feed inbound objects to the chain manager.

pub mod intake;

pub use intake::{spawn_intake, Inbound, IntakeError, IntakeHandle, IntakeOutcome};
