//! Pure validation logic: stages, errors and the per-stage checks.

pub mod checks;
pub mod context;
pub mod errors;
pub mod stage;
