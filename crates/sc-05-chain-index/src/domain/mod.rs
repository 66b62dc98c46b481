//! Chain index domain layer.

pub mod errors;
pub mod fork_choice;
