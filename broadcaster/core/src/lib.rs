//! Broadcaster Core - In-Process Server-Sent Events Fan-Out
//!
//! This crate keeps a registry of live subscribers and pushes every published
//! event to all of them over long-lived `text/event-stream` responses. There
//! is no persistence and no replay: a subscriber sees only events published
//! while it is connected.
//!
//! # Architecture
//!
//! ```text
//!   POST {prefix}/dispatch?data=..         GET {prefix}/subscribe
//!              │                                     │
//!              ▼                                     ▼
//! ┌──────────────────────────┐        ┌──────────────────────────────┐
//! │         Registry         │        │       SubscriptionPump       │
//! │  id ──► Subscriber (tx)  │──────► │  EventStream (rx, bounded)   │
//! │  broadcast(): try_send   │  drop  │  select! event / keepalive / │
//! │  to every admitting one  │  when  │          shutdown            │
//! └──────────────────────────┘  full  └──────────────┬───────────────┘
//!                                                    │ Frame::encode()
//!                                                    ▼
//!                                      event: dispatched\ndata: ..\n\n
//! ```
//!
//! # Key Types
//!
//! - [`Registry`]: Process-wide set of subscribers; broadcast never blocks
//! - [`Subscriber`]: Delivery half of one subscription (bounded buffer + rules)
//! - [`EventStream`]: Receiving half, owned by the connection
//! - [`Registration`]: Handle that removes the subscriber when released or dropped
//! - [`Event`]: Shared, immutable event payload with optional attributes
//!
//! # Module Overview
//!
//! - [`config`]: TOML, environment and CLI configuration
//! - [`event`]: The event value passed through the registry
//! - [`registry`]: Subscriber registry and broadcast
//! - [`subscriber`]: Per-subscriber buffer and admission rules
//! - [`transport`]: SSE framing, connection pump and HTTP router

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod event;
pub mod registry;
pub mod subscriber;
pub mod transport;

// Re-exports for convenience
pub use event::Event;
pub use registry::{BroadcastResult, Registration, Registry, SubscriberId};
pub use subscriber::{Delivery, EventStream, Rule, Subscriber, DEFAULT_BUFFER_CAPACITY};

// Transport exports
pub use transport::{build_router, ApiError, AppState, Frame, SubscriptionPump};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, BroadcasterConfig, ConfigError,
    ConfigOverrides, ConfigSource,
};
