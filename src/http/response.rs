//! Response helpers and the handler error type.
//!
//! # Responsibilities
//! - Synthesize the generic error bodies callers are allowed to see
//! - Carry a handler failure (message + backtrace) out to the error boundary
//!
//! # Design Decisions
//! - The failure rides in response extensions; the body never holds details
//! - Any `std::error::Error` converts into [`HandlerError`] with `?`

use std::backtrace::Backtrace;
use std::fmt;
use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Body of every synthesized error response.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub detail: &'static str,
}

/// `500` with `{"detail": "Internal Server Error"}`.
pub fn internal_server_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorDetail { detail: "Internal Server Error" }),
    )
        .into_response()
}

/// `404` with `{"detail": "Not Found"}`.
pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(ErrorDetail { detail: "Not Found" })).into_response()
}

/// An unhandled failure escaping a route handler.
///
/// Handlers return `Result<_, HandlerError>`; the request middleware turns
/// it into a logged `unhandled_exception` and a generic 500.
#[derive(Clone)]
pub struct HandlerError {
    inner: Arc<ErrorReport>,
}

struct ErrorReport {
    message: String,
    backtrace: Backtrace,
}

impl HandlerError {
    /// Create an error from a plain message.
    pub fn msg(message: impl fmt::Display) -> Self {
        Self {
            inner: Arc::new(ErrorReport {
                message: message.to_string(),
                backtrace: Backtrace::force_capture(),
            }),
        }
    }

    /// Formatted trace for the `exception` log field.
    pub fn exception(&self) -> String {
        format!("{}\n{}", self.inner.message, self.inner.backtrace)
    }
}

impl<E> From<E> for HandlerError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::msg(message)
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.message)
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerError")
            .field("message", &self.inner.message)
            .finish_non_exhaustive()
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let mut response = internal_server_error();
        response.extensions_mut().insert(self);
        response
    }
}
