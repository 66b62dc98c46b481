//! Storage domain: errors, key schema, record framing.

pub mod errors;
pub mod keys;
pub mod record;
