//! # Storage Subsystem (sc-01)
//!
//! The ordered key-value store the node core persists into, the key schema
//! every other subsystem writes with, and CRC32 framing for block records.
//!
//! ## Architecture
//!
//! ```text
//! ledger / chain index ──ops──► Vec<BatchOperation> ──► KeyValueStore::atomic_batch_write
//!                                                        ├── InMemoryKVStore   (tests, ephemeral nodes)
//!                                                        └── RocksDbStore      (feature = "rocksdb")
//! ```
//!
//! The store never interprets keys. `KeyPrefix` is the only place key bytes
//! are built.

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::memory::InMemoryKVStore;
pub use adapters::fault::FaultInjectingStore;
#[cfg(feature = "rocksdb")]
pub use adapters::rocksdb_adapter::{RocksDbConfig, RocksDbStore};
pub use domain::errors::KVStoreError;
pub use domain::keys::KeyPrefix;
pub use domain::record::{frame, unframe};
pub use ports::outbound::{BatchOperation, KeyValueStore, ScanResult};
