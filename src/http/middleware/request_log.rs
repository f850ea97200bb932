//! Request logging and the error boundary.
//!
//! Every request produces exactly one event: `request_handled` when the
//! handler returned a response, `unhandled_exception` when it returned a
//! [`HandlerError`] or panicked. Failures are answered with a generic 500
//! and never propagate past this layer.

use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request},
    middleware::Next,
    response::Response,
};
use futures_util::FutureExt;

use crate::http::response::{internal_server_error, HandlerError};
use crate::observability::panic::{contained, payload_message, take_last_panic};

struct Failure {
    error: String,
    exception: String,
}

pub async fn request_log(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let path = request.uri().path().to_owned();
    let method = request.method().clone();
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());

    let outcome = contained(AssertUnwindSafe(next.run(request)).catch_unwind()).await;
    let duration_ms = elapsed_ms(start);

    let failure = match outcome {
        Ok(mut response) => match response.extensions_mut().remove::<HandlerError>() {
            None => {
                tracing::info!(
                    path = %path,
                    method = %method,
                    status_code = response.status().as_u16(),
                    duration_ms,
                    client_ip = client_ip.as_deref(),
                    "request_handled"
                );
                return response;
            }
            Some(err) => Failure {
                error: err.to_string(),
                exception: err.exception(),
            },
        },
        Err(payload) => {
            let message = payload_message(&*payload);
            let exception = take_last_panic()
                .map(|report| report.exception())
                .unwrap_or_else(|| format!("panicked: {message}"));
            Failure {
                error: message,
                exception,
            }
        }
    };

    tracing::error!(
        path = %path,
        method = %method,
        duration_ms,
        client_ip = client_ip.as_deref(),
        error = %failure.error,
        exception = %failure.exception,
        "unhandled_exception"
    );
    internal_server_error()
}

/// Milliseconds since `start`, rounded to two decimals.
fn elapsed_ms(start: Instant) -> f64 {
    round_ms(start.elapsed().as_secs_f64() * 1000.0)
}

fn round_ms(ms: f64) -> f64 {
    (ms * 100.0).round() / 100.0
}
