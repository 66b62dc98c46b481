//! # Event Subscriber
//!
//! The receiving side of a registration.

use crate::events::{EventEnvelope, EventFilter};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identifies one registration on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The subscription was unregistered or the bus was dropped.
    #[error("Event bus closed")]
    Closed,
}

/// Receiving handle for one registration.
///
/// Filtering happens on the publish side, so every received event matches
/// `filter()`.
pub struct Subscription {
    id: SubscriptionId,
    receiver: mpsc::Receiver<EventEnvelope>,
    filter: EventFilter,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriptionId,
        receiver: mpsc::Receiver<EventEnvelope>,
        filter: EventFilter,
    ) -> Self {
        Self {
            id,
            receiver,
            filter,
        }
    }

    /// Registration id; pass to `ChainEventBus::unregister`.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Receive the next event. `None` once unregistered and drained.
    pub async fn recv(&mut self) -> Option<EventEnvelope> {
        self.receiver.recv().await
    }

    /// Receive without waiting.
    ///
    /// - `Ok(Some(event))` - An event was queued
    /// - `Ok(None)` - Nothing queued
    /// - `Err(SubscriptionError::Closed)` - Unregistered and drained
    pub fn try_recv(&mut self) -> Result<Option<EventEnvelope>, SubscriptionError> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(SubscriptionError::Closed),
        }
    }

    /// Drain everything queued right now.
    pub fn drain(&mut self) -> Vec<EventEnvelope> {
        let mut out = Vec::new();
        while let Ok(Some(event)) = self.try_recv() {
            out.push(event);
        }
        out
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}
