//! # Chain Events
//!
//! Everything observers can learn about the chain after a commit.

use serde::{Deserialize, Serialize};
use shared_types::{ChainTip, Hash, Height};

/// A post-commit chain event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainEvent {
    /// A block joined the active chain.
    BlockConnected { hash: Hash, height: Height },
    /// A block left the active chain during a reorg.
    BlockDisconnected { hash: Hash, height: Height },
    /// The active tip moved. `reorg_depth` is 0 for a plain extension.
    TipChanged {
        old: ChainTip,
        new: ChainTip,
        reorg_depth: u64,
    },
    /// Pool entries dropped after revalidation against the new tip.
    TransactionsEvicted { hashes: Vec<Hash> },
}

impl ChainEvent {
    /// Topic for filtering.
    pub fn topic(&self) -> EventTopic {
        match self {
            ChainEvent::BlockConnected { .. } | ChainEvent::BlockDisconnected { .. } => {
                EventTopic::Blocks
            }
            ChainEvent::TipChanged { .. } => EventTopic::Tip,
            ChainEvent::TransactionsEvicted { .. } => EventTopic::TxPool,
        }
    }
}

/// An event with its bus-wide sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventEnvelope {
    pub sequence: u64,
    pub event: ChainEvent,
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Block connect/disconnect.
    Blocks,
    /// Tip movement.
    Tip,
    /// Transaction pool evictions.
    TxPool,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &ChainEvent) -> bool {
        self.topics.is_empty() || self.topics.contains(&event.topic())
    }
}
