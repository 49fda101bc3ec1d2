//! Subscriber Registry
//!
//! The [`Registry`] holds every live subscriber and fans published events out
//! to them.
//!
//! # Architecture
//!
//! ```text
//!                          Registry
//!              ┌─────────────────────────────────────┐
//!              │ HashMap<SubscriberId, Subscriber>   │
//!              │ next_id: u64                        │
//!              │   - wrapped in Arc<RwLock<>>        │
//!              └──────────────────┬──────────────────┘
//!                                 │ broadcast(): snapshot, then try_send
//!              ┌──────────────────┼──────────────────┐
//!              │                  │                  │
//!       ┌──────▼──────┐    ┌──────▼──────┐    ┌──────▼──────┐
//!       │   sub-1     │    │   sub-2     │    │   sub-3     │
//!       │ [buf: 100]  │    │ [buf: full] │    │ [buf: 100]  │
//!       └─────────────┘    └─────────────┘    └─────────────┘
//!                              (dropped)
//! ```
//!
//! # Thread Safety
//!
//! Broadcasts only take the read lock, and only while cloning the subscriber
//! list. Delivery happens after the lock is released, so concurrent
//! broadcasts never wait on each other and register/unregister only wait for
//! the snapshot copy. Delivery itself is `try_send`, so a full or stalled
//! subscriber cannot hold up anyone else.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::subscriber::{Delivery, Subscriber};

/// Identifier of a registration
///
/// Allocated from a per-registry counter, strictly increasing in registration
/// order and never reused while the registry lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Create an ID from a raw value (for testing)
    #[cfg(test)]
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw numeric value
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Result of a broadcast
///
/// Only used for logging and tests; publishers over HTTP never see it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastResult {
    /// Subscribers the event was offered to
    pub recipients: usize,
    /// Subscribers that buffered the event
    pub accepted: usize,
    /// Subscribers whose rules rejected the event
    pub rejected: usize,
    /// Subscribers whose buffer was full or already closed
    pub dropped: usize,
}

impl BroadcastResult {
    fn record(&mut self, delivery: Delivery) {
        self.recipients += 1;
        match delivery {
            Delivery::Accepted => self.accepted += 1,
            Delivery::Rejected => self.rejected += 1,
            Delivery::Dropped | Delivery::Closed => self.dropped += 1,
        }
    }
}

#[derive(Default)]
struct RegistryState {
    subscribers: HashMap<SubscriberId, Subscriber>,
    next_id: u64,
}

/// Registry of live subscribers
///
/// Clones share the same underlying state, so one registry can be created at
/// startup and handed to every entry point that needs it.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<RwLock<RegistryState>>,
}

impl Registry {
    /// Create a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber
    ///
    /// The returned [`Registration`] removes the entry when released or
    /// dropped. Always succeeds.
    pub fn register(&self, subscriber: Subscriber) -> Registration {
        let (id, count) = {
            let mut state = self.inner.write();
            state.next_id += 1;
            let id = SubscriberId(state.next_id);
            state.subscribers.insert(id, subscriber);
            (id, state.subscribers.len())
        };

        tracing::info!(
            subscriber_id = %id,
            subscribers = count,
            "Subscriber registered"
        );

        Registration {
            id,
            registry: self.clone(),
            released: AtomicBool::new(false),
        }
    }

    /// Remove a subscriber by ID
    ///
    /// Returns true if an entry was removed. Unknown or already-removed IDs are
    /// a no-op.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let (removed, count) = {
            let mut state = self.inner.write();
            let removed = state.subscribers.remove(&id).is_some();
            (removed, state.subscribers.len())
        };

        if removed {
            tracing::info!(
                subscriber_id = %id,
                subscribers = count,
                "Subscriber unregistered"
            );
        }
        removed
    }

    /// Offer an event to every registered subscriber
    ///
    /// Never blocks: subscribers with a full buffer miss the event.
    pub fn broadcast(&self, event: &Event) -> BroadcastResult {
        let snapshot: Vec<(SubscriberId, Subscriber)> = {
            let state = self.inner.read();
            state
                .subscribers
                .iter()
                .map(|(id, subscriber)| (*id, subscriber.clone()))
                .collect()
        };

        let mut result = BroadcastResult::default();
        for (id, subscriber) in &snapshot {
            let delivery = subscriber.publish(event);
            if matches!(delivery, Delivery::Dropped | Delivery::Closed) {
                tracing::trace!(
                    subscriber_id = %id,
                    delivery = ?delivery,
                    "Event not delivered"
                );
            }
            result.record(delivery);
        }

        tracing::debug!(
            recipients = result.recipients,
            accepted = result.accepted,
            rejected = result.rejected,
            dropped = result.dropped,
            "Event broadcast"
        );
        result
    }

    /// Get the number of registered subscribers
    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.read().subscribers.len()
    }

    /// Check if a subscriber is registered
    #[must_use]
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.inner.read().subscribers.contains_key(&id)
    }

    /// Get the IDs of all registered subscribers, in ascending order
    #[must_use]
    pub fn ids(&self) -> Vec<SubscriberId> {
        let mut ids: Vec<SubscriberId> = self.inner.read().subscribers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.read();
        f.debug_struct("Registry")
            .field("subscriber_count", &state.subscribers.len())
            .field("next_id", &state.next_id)
            .finish()
    }
}

/// Handle to one registration
///
/// Releasing is idempotent and safe to race with broadcasts. Dropping the
/// handle releases it, so holding a `Registration` for the lifetime of a
/// connection guarantees the entry is removed on every exit path.
pub struct Registration {
    id: SubscriberId,
    registry: Registry,
    released: AtomicBool,
}

impl Registration {
    /// The ID assigned at registration
    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Remove the entry from the registry
    ///
    /// Returns true only for the call that actually removed it.
    pub fn release(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.registry.unregister(self.id)
    }

    /// Whether [`release`](Self::release) has already run
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("released", &self.is_released())
            .finish()
    }
}
