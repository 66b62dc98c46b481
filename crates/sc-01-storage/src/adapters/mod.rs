//! Store adapters.

pub mod fault;
pub mod memory;
#[cfg(feature = "rocksdb")]
pub mod rocksdb_adapter;
