//! # Event Publisher
//!
//! Registration table plus ordered, non-blocking fan-out.

use crate::events::{ChainEvent, EventEnvelope, EventFilter};
use crate::subscriber::{Subscription, SubscriptionId};
use crate::DEFAULT_CHANNEL_CAPACITY;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Trait for publishing chain events.
pub trait EventPublisher: Send + Sync {
    /// Publish an event. Returns the number of subscribers it was queued for.
    fn publish(&self, event: ChainEvent) -> usize;

    /// Total events published.
    fn events_published(&self) -> u64;
}

struct Registration {
    id: SubscriptionId,
    sender: mpsc::Sender<EventEnvelope>,
    filter: EventFilter,
}

/// In-process chain event bus.
pub struct ChainEventBus {
    /// Held for the whole fan-out of one event, so two publishers cannot
    /// interleave and every subscriber sees the same order.
    registrations: Mutex<Vec<Registration>>,
    next_sequence: AtomicU64,
    dropped: AtomicU64,
    capacity: usize,
}

impl ChainEventBus {
    /// Bus with the default per-subscriber capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Bus with a specific per-subscriber capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            registrations: Mutex::new(Vec::new()),
            next_sequence: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            capacity: capacity.max(1),
        }
    }

    /// Register an observer for events matching `filter`.
    #[must_use]
    pub fn register(&self, filter: EventFilter) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let id = SubscriptionId::new();
        self.registrations.lock().push(Registration {
            id,
            sender,
            filter: filter.clone(),
        });
        debug!(subscription = %id, topics = ?filter.topics, "[bus] Subscriber registered");
        Subscription::new(id, receiver, filter)
    }

    /// Remove a registration. Events already queued stay readable.
    pub fn unregister(&self, id: SubscriptionId) -> bool {
        let mut registrations = self.registrations.lock();
        let before = registrations.len();
        registrations.retain(|r| r.id != id);
        let removed = registrations.len() != before;
        if removed {
            debug!(subscription = %id, "[bus] Subscriber unregistered");
        }
        removed
    }

    /// Number of live registrations.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registrations.lock().len()
    }

    /// Events dropped because a subscriber queue was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for ChainEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for ChainEventBus {
    fn publish(&self, event: ChainEvent) -> usize {
        let mut registrations = self.registrations.lock();
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let topic = event.topic();
        let mut delivered = 0;

        registrations.retain(|registration| {
            if !registration.filter.matches(&event) {
                return !registration.sender.is_closed();
            }
            let envelope = EventEnvelope {
                sequence,
                event: event.clone(),
            };
            match registration.sender.try_send(envelope) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        subscription = %registration.id,
                        ?topic,
                        sequence,
                        "[bus] Subscriber queue full, event dropped"
                    );
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(subscription = %registration.id, "[bus] Subscriber gone, removing");
                    false
                }
            }
        });

        debug!(?topic, sequence, receivers = delivered, "[bus] Event published");
        delivered
    }

    fn events_published(&self) -> u64 {
        self.next_sequence.load(Ordering::SeqCst)
    }
}
