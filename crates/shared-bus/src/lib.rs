//! # Shared Bus - Chain Event Channel
//!
//! Observers register with the bus and receive chain events in commit
//! order. The chain manager publishes only after a commit is durable and the
//! in-memory state has been swapped, so no subscriber ever sees an event for
//! a half-applied reorg.
//!
//! ```text
//! ChainManager ──publish()──► ChainEventBus ──try_send──► Subscription (mpsc, bounded)
//!                                   │          ──try_send──► Subscription
//!                                   └── register() / unregister()
//! ```
//!
//! ## Delivery Guarantees
//!
//! - Every event carries a bus-wide sequence number; each subscriber sees
//!   strictly increasing sequences.
//! - A full subscriber queue drops that event for that subscriber only and
//!   logs a warning. Publishing never blocks.
//! - Subscribers whose receiver was dropped are removed on the next publish.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{ChainEvent, EventEnvelope, EventFilter, EventTopic};
pub use publisher::{ChainEventBus, EventPublisher};
pub use subscriber::{Subscription, SubscriptionError, SubscriptionId};

/// Maximum events to buffer per subscriber before dropping.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
