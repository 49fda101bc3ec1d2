//! HTTP error responses.
//!
//! Request-validation failures become a client-error status with a short
//! text body. Internal failures are logged here and answered with an empty
//! 500 so nothing server-side leaks to the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Body returned when a publish request carries no payload
pub const MISSING_DATA_MESSAGE: &str = "`data` value is empty or missing from query string";

/// Error returned by HTTP handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request was malformed or incomplete
    #[error("{0}")]
    BadRequest(String),

    /// The server could not assemble a response
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// The status code this error maps to
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
