//! Transport Layer
//!
//! Everything between the registry and the network:
//! - [`sse`]: wire framing of event and keepalive blocks
//! - [`pump`]: per-connection wait loop with keepalive and cancellation
//! - [`http`]: axum router and handlers for subscribe, dispatch and health

pub mod http;
pub mod pump;
pub mod sse;

// Re-exports for convenience
pub use http::{build_router, ApiError, AppState};
pub use pump::{SubscriptionPump, DEFAULT_KEEPALIVE_INTERVAL};
pub use sse::Frame;
