//! Subscribers
//!
//! A subscriber is one consumer of broadcast events. It is split in two halves:
//!
//! - [`Subscriber`]: the delivery half. Cheap to clone; the registry keeps one
//!   clone per registration and offers events to it.
//! - [`EventStream`]: the receiving half, owned by whoever serves the consumer
//!   (normally a single SSE connection).
//!
//! ```text
//!   Registry::broadcast ──► Subscriber::publish ──► [ rules ] ──► bounded buffer
//!                                                                      │
//!                                       connection pump ◄── EventStream┘
//! ```
//!
//! `publish` never waits: a rejected event stops at the first rule that says
//! no, and an admitted event that finds the buffer full is discarded.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::mpsc;

use crate::event::Event;

/// Default per-subscriber buffer capacity
pub const DEFAULT_BUFFER_CAPACITY: usize = 100;

// ============================================================================
// Admission rules
// ============================================================================

/// Predicate deciding whether a subscriber accepts an event
///
/// Rules are fixed when the subscriber is created and evaluated in order on
/// every publish.
#[derive(Clone)]
pub struct Rule {
    name: Arc<str>,
    predicate: Arc<dyn Fn(&Event) -> bool + Send + Sync>,
}

impl Rule {
    /// Build a rule from an arbitrary predicate
    pub fn new<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name.into()),
            predicate: Arc::new(predicate),
        }
    }

    /// Accept only events whose payload is exactly `expected`
    #[must_use]
    pub fn payload_equals(expected: impl Into<String>) -> Self {
        let expected = expected.into();
        Self::new(format!("payload == {expected:?}"), move |event| {
            event.payload() == expected
        })
    }

    /// Accept only events carrying `key = value`
    #[must_use]
    pub fn attribute_equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        Self::new(format!("{key} == {value:?}"), move |event| {
            event.attribute(&key) == Some(value.as_str())
        })
    }

    /// Accept only events published to `topic`
    #[must_use]
    pub fn topic(topic: impl Into<String>) -> Self {
        Self::attribute_equals(crate::event::TOPIC_ATTRIBUTE, topic)
    }

    /// Human-readable description, used in logs
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluate the rule
    #[must_use]
    pub fn admits(&self, event: &Event) -> bool {
        (self.predicate)(event)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Rule").field(&self.name).finish()
    }
}

// ============================================================================
// Delivery outcome
// ============================================================================

/// What happened to one event offered to one subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Enqueued into the subscriber's buffer
    Accepted,
    /// An admission rule rejected it
    Rejected,
    /// The buffer was full; the event was discarded
    Dropped,
    /// The receiving half is gone
    Closed,
}

impl Delivery {
    /// Whether the event made it into the buffer
    #[must_use]
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

// ============================================================================
// Subscriber (delivery half)
// ============================================================================

/// Delivery half of a subscriber
#[derive(Clone)]
pub struct Subscriber {
    tx: mpsc::Sender<Event>,
    rules: Arc<[Rule]>,
}

impl Subscriber {
    /// Create a subscriber with a buffer of `capacity` events
    ///
    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn channel(capacity: usize, rules: Vec<Rule>) -> (Self, EventStream) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let subscriber = Self {
            tx,
            rules: rules.into(),
        };
        (subscriber, EventStream { rx })
    }

    /// Create a subscriber with [`DEFAULT_BUFFER_CAPACITY`]
    #[must_use]
    pub fn new_default(rules: Vec<Rule>) -> (Self, EventStream) {
        Self::channel(DEFAULT_BUFFER_CAPACITY, rules)
    }

    /// Offer an event without waiting
    ///
    /// Rules short-circuit on the first rejection. Safe to call while holding
    /// locks: this never awaits and never blocks.
    pub fn publish(&self, event: &Event) -> Delivery {
        if let Some(rule) = self.rules.iter().find(|rule| !rule.admits(event)) {
            tracing::trace!(rule = rule.name(), "Event rejected by admission rule");
            return Delivery::Rejected;
        }

        match self.tx.try_send(event.clone()) {
            Ok(()) => Delivery::Accepted,
            Err(mpsc::error::TrySendError::Full(_)) => Delivery::Dropped,
            Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// Total buffer capacity
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Number of events currently waiting in the buffer
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// The admission rules, in evaluation order
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Whether the receiving half is still alive
    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("capacity", &self.capacity())
            .field("buffered", &self.buffered())
            .field("rules", &self.rules)
            .finish()
    }
}

// ============================================================================
// EventStream (receiving half)
// ============================================================================

/// Receiving half of a subscriber
///
/// Yields events in the order they were enqueued. Draining frees buffer space
/// for later publishes. Ends only once every [`Subscriber`] clone is dropped.
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::Receiver<Event>,
}

impl EventStream {
    /// Wait for the next event
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Take the next event if one is already buffered
    pub fn try_recv(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }

    /// Close the stream; later publishes report [`Delivery::Closed`]
    ///
    /// Events already buffered can still be drained.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

impl futures::Stream for EventStream {
    type Item = Event;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}
