//! Request handlers for the subscribe, dispatch and health endpoints.

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{self, header, StatusCode};
use axum::response::{Json, Response};
use serde::{Deserialize, Serialize};

use super::error::{ApiError, MISSING_DATA_MESSAGE};
use super::AppState;
use crate::event::Event;
use crate::subscriber::{Rule, Subscriber};
use crate::transport::pump::SubscriptionPump;
use crate::transport::sse;

/// Raw query pairs, in request order
///
/// Parsed as a list rather than a struct so a repeated key never rejects the
/// request; the first non-empty value wins.
type QueryPairs = Query<Vec<(String, String)>>;

fn first_value(pairs: &[(String, String)], key: &str) -> Option<String> {
    pairs
        .iter()
        .find(|(k, v)| k == key && !v.is_empty())
        .map(|(_, v)| v.clone())
}

/// Query parameters accepted by the subscribe endpoint
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SubscribeParams {
    /// Only deliver events published to this topic
    pub topic: Option<String>,
}

impl SubscribeParams {
    /// Pick the recognised parameters out of the query pairs
    #[must_use]
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            topic: first_value(pairs, "topic"),
        }
    }
}

/// Query parameters accepted by the dispatch endpoint
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DispatchParams {
    /// Event payload
    pub data: Option<String>,
    /// Optional topic attached to the event
    pub topic: Option<String>,
}

impl DispatchParams {
    /// Pick the recognised parameters out of the query pairs
    #[must_use]
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            data: first_value(pairs, "data"),
            topic: first_value(pairs, "topic"),
        }
    }
}

/// Health endpoint body
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// Always "ok" while the process serves requests
    pub status: String,
    /// Registered subscribers at the time of the request
    pub subscribers: usize,
}

/// `GET {prefix}/subscribe`: open an event stream
pub async fn subscribe(
    State(state): State<AppState>,
    Query(pairs): QueryPairs,
) -> Result<Response, ApiError> {
    let params = SubscribeParams::from_pairs(&pairs);
    let rules: Vec<Rule> = params.topic.map(Rule::topic).into_iter().collect();

    let (subscriber, stream) = Subscriber::channel(state.config.buffer_capacity, rules);
    let registration = state.registry.register(subscriber);
    let pump = SubscriptionPump::new(
        stream,
        registration,
        state.config.keepalive_interval,
        state.shutdown.child_token(),
    );

    // On error the body, and with it the registration, is dropped here.
    http::Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, sse::CONTENT_TYPE)
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .body(Body::from_stream(pump.into_body_stream()))
        .map_err(|e| ApiError::Internal(format!("failed to build event stream response: {e}")))
}

/// `POST {prefix}/dispatch?data=...`: publish an event
pub async fn dispatch(
    State(state): State<AppState>,
    Query(pairs): QueryPairs,
) -> Result<StatusCode, ApiError> {
    let params = DispatchParams::from_pairs(&pairs);
    let data = params
        .data
        .ok_or_else(|| ApiError::BadRequest(MISSING_DATA_MESSAGE.to_string()))?;

    let event = match params.topic {
        Some(topic) => Event::new(data).with_topic(topic),
        None => Event::new(data),
    };
    state.registry.broadcast(&event);

    Ok(StatusCode::OK)
}

/// `GET /health`: liveness plus the current subscriber count
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        subscribers: state.registry.count(),
    })
}
