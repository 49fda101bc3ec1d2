//! Events
//!
//! An [`Event`] is the unit of data a publisher hands to the registry. It is
//! immutable once it has been built and is shared, not copied, between all
//! subscribers a broadcast reaches.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Attribute key used for topic-based filtering
pub const TOPIC_ATTRIBUTE: &str = "topic";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct EventData {
    payload: String,
    attributes: BTreeMap<String, String>,
}

/// One published event
///
/// Cloning an `Event` only bumps a reference count, so a broadcast to many
/// subscribers never duplicates the payload.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event {
    inner: Arc<EventData>,
}

impl Event {
    /// Create an event carrying `payload` and no attributes
    #[must_use]
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(EventData {
                payload: payload.into(),
                attributes: BTreeMap::new(),
            }),
        }
    }

    /// Attach an attribute
    ///
    /// Intended for use while the event is still being built. If the event has
    /// already been shared, the attributes are copied into a fresh event and the
    /// existing clones keep seeing the old value.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.inner)
            .attributes
            .insert(key.into(), value.into());
        self
    }

    /// Attach a topic attribute
    #[must_use]
    pub fn with_topic(self, topic: impl Into<String>) -> Self {
        self.with_attribute(TOPIC_ATTRIBUTE, topic)
    }

    /// The event payload
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.inner.payload
    }

    /// Look up a single attribute
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.inner.attributes.get(key).map(String::as_str)
    }

    /// All attributes, ordered by key
    #[must_use]
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.inner.attributes
    }

    /// The topic attribute, if set
    #[must_use]
    pub fn topic(&self) -> Option<&str> {
        self.attribute(TOPIC_ATTRIBUTE)
    }

    /// Whether two handles point at the same shared event
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("payload", &self.inner.payload)
            .field("attributes", &self.inner.attributes)
            .finish()
    }
}

impl From<&str> for Event {
    fn from(payload: &str) -> Self {
        Self::new(payload)
    }
}

impl From<String> for Event {
    fn from(payload: String) -> Self {
        Self::new(payload)
    }
}
