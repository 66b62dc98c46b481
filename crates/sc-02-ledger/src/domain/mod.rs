//! Ledger domain layer.

pub mod account;
pub mod errors;
pub mod layers;
pub mod pending;
pub mod rules;
pub mod view;
