//! HTTP surface.
//!
//! Builds the axum router and defines the state shared by every handler.
//!
//! # Routes
//!
//! | Method | Path                   | Purpose                          |
//! |--------|------------------------|----------------------------------|
//! | GET    | `{prefix}/subscribe`   | long-lived SSE stream            |
//! | POST   | `{prefix}/dispatch`    | publish `data` to all subscribers|
//! | GET    | `/health`              | liveness and subscriber count    |
//!
//! Any other method on these paths is answered with 405 and no body.

mod error;
mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::config::BroadcasterConfig;
use crate::registry::Registry;

pub use error::{ApiError, MISSING_DATA_MESSAGE};
pub use handlers::{DispatchParams, HealthResponse, SubscribeParams};

/// State injected into every handler
#[derive(Clone, Debug)]
pub struct AppState {
    /// The process-wide subscriber registry
    pub registry: Registry,
    /// Effective configuration
    pub config: Arc<BroadcasterConfig>,
    /// Cancelled on server shutdown; ends every open stream
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Create state around a fresh registry
    #[must_use]
    pub fn new(config: BroadcasterConfig, shutdown: CancellationToken) -> Self {
        Self {
            registry: Registry::new(),
            config: Arc::new(config),
            shutdown,
        }
    }
}

/// Build the router for the given state
pub fn build_router(state: AppState) -> Router {
    let prefix = state.config.route_prefix.trim_end_matches('/').to_string();

    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
            )
        });

    Router::new()
        .route(&format!("{prefix}/subscribe"), get(handlers::subscribe))
        .route(&format!("{prefix}/dispatch"), post(handlers::dispatch))
        .route("/health", get(handlers::health))
        .layer(trace_layer)
        .with_state(state)
}
