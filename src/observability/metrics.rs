//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define the per-request HTTP metrics
//! - Record them from a middleware wrapping every route
//! - Expose Prometheus-compatible text on the metrics endpoint
//! - Run recorder upkeep so unscraped samples do not accumulate
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by handler, method, status class
//! - `http_request_duration_seconds` (histogram): latency by handler, method
//! - `http_request_duration_highr_seconds` (histogram): unlabelled, fine buckets
//! - `http_request_size_bytes` (summary): request body size by handler
//! - `http_response_size_bytes` (summary): response body size by handler
//!
//! # Design Decisions
//! - The recorder is owned by [`Instrumentation`], never installed globally
//! - `handler` is the matched route template; unmatched paths use `none`
//! - Status codes are grouped (`2xx`, `4xx`, ...) to bound cardinality
//! - Body sizes come from `Content-Length`, else the body's exact size hint, else 0

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::HttpBody,
    extract::{MatchedPath, Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::validation::strictly_increasing;
use crate::config::MetricsConfig;

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const REQUEST_DURATION: &str = "http_request_duration_seconds";
pub const REQUEST_DURATION_HIGHR: &str = "http_request_duration_highr_seconds";
pub const REQUEST_SIZE: &str = "http_request_size_bytes";
pub const RESPONSE_SIZE: &str = "http_response_size_bytes";

/// Label value for requests that matched no route.
pub const UNMATCHED_HANDLER: &str = "none";

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Errors raised while building the metrics recorder.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("{0} buckets must be non-empty and strictly increasing")]
    InvalidBuckets(&'static str),

    #[error("upkeep interval must be greater than zero")]
    ZeroUpkeepInterval,

    #[error("failed to build Prometheus recorder: {0}")]
    Build(#[from] BuildError),
}

/// One finished request, as seen by the metrics middleware.
#[derive(Debug, Clone)]
pub struct RequestSample<'a> {
    pub handler: &'a str,
    pub method: Method,
    pub status: StatusCode,
    pub elapsed: Duration,
    pub request_bytes: u64,
    pub response_bytes: u64,
}

/// Prometheus recorder plus the path its exposition is served on.
#[derive(Clone)]
pub struct Instrumentation {
    recorder: Arc<PrometheusRecorder>,
    handle: PrometheusHandle,
    path: String,
    upkeep_interval: Duration,
}

impl Instrumentation {
    pub fn new(config: &MetricsConfig) -> Result<Self, MetricsError> {
        if !strictly_increasing(&config.duration_buckets) {
            return Err(MetricsError::InvalidBuckets(REQUEST_DURATION));
        }
        if !strictly_increasing(&config.highr_buckets) {
            return Err(MetricsError::InvalidBuckets(REQUEST_DURATION_HIGHR));
        }
        if config.upkeep_interval_secs == 0 {
            return Err(MetricsError::ZeroUpkeepInterval);
        }

        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full(REQUEST_DURATION.to_string()),
                &config.duration_buckets,
            )?
            .set_buckets_for_metric(
                Matcher::Full(REQUEST_DURATION_HIGHR.to_string()),
                &config.highr_buckets,
            )?
            .build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            describe_counter!(REQUESTS_TOTAL, Unit::Count, "Total number of requests by method, status and handler.");
            describe_histogram!(REQUEST_DURATION, Unit::Seconds, "Latency with only few buckets by handler.");
            describe_histogram!(REQUEST_DURATION_HIGHR, Unit::Seconds, "Latency with many buckets but no labels.");
            describe_histogram!(REQUEST_SIZE, Unit::Bytes, "Content length of incoming requests by handler.");
            describe_histogram!(RESPONSE_SIZE, Unit::Bytes, "Content length of outgoing responses by handler.");
        });

        Ok(Self {
            recorder: Arc::new(recorder),
            handle,
            path: config.path.clone(),
            upkeep_interval: Duration::from_secs(config.upkeep_interval_secs),
        })
    }

    /// Path the exposition endpoint is mounted on.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Render the current exposition text.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Fold pending histogram samples into their buckets.
    pub fn run_upkeep(&self) {
        self.handle.run_upkeep();
    }

    /// Run [`Instrumentation::run_upkeep`] every configured interval until
    /// `shutdown` fires.
    pub fn spawn_upkeep(&self, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let instrumentation = self.clone();
        let mut ticker = tokio::time::interval(self.upkeep_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = ticker.tick() => instrumentation.run_upkeep(),
                    _ = shutdown.recv() => break,
                }
            }
            tracing::debug!("metrics_upkeep_stopped");
        })
    }

    /// Record one finished request.
    pub fn record_request(&self, sample: &RequestSample<'_>) {
        let handler = sample.handler.to_string();
        let method = sample.method.to_string();
        let status = status_class(sample.status);
        let secs = sample.elapsed.as_secs_f64();

        metrics::with_local_recorder(self.recorder.as_ref(), || {
            metrics::counter!(
                REQUESTS_TOTAL,
                "handler" => handler.clone(),
                "method" => method.clone(),
                "status" => status
            )
            .increment(1);
            metrics::histogram!(REQUEST_DURATION, "handler" => handler.clone(), "method" => method)
                .record(secs);
            metrics::histogram!(REQUEST_DURATION_HIGHR).record(secs);
            metrics::histogram!(REQUEST_SIZE, "handler" => handler.clone())
                .record(sample.request_bytes as f64);
            metrics::histogram!(RESPONSE_SIZE, "handler" => handler)
                .record(sample.response_bytes as f64);
        });
    }
}

/// Group a status code into its class label (`2xx`, `5xx`, ...).
pub fn status_class(status: StatusCode) -> String {
    format!("{}xx", status.as_u16() / 100)
}

/// Body size in bytes: `Content-Length`, else an exact size hint, else 0.
pub fn body_size<B: HttpBody>(headers: &HeaderMap, body: &B) -> u64 {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .or_else(|| body.size_hint().exact())
        .unwrap_or(0)
}

/// Middleware recording every request passing through it.
pub async fn track_metrics(
    State(instrumentation): State<Instrumentation>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let request_bytes = body_size(request.headers(), request.body());
    let handler = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| UNMATCHED_HANDLER.to_owned());

    let response = next.run(request).await;

    instrumentation.record_request(&RequestSample {
        handler: &handler,
        method,
        status: response.status(),
        elapsed: start.elapsed(),
        request_bytes,
        response_bytes: body_size(response.headers(), response.body()),
    });
    response
}

/// Exposition endpoint handler.
pub async fn render_metrics(State(instrumentation): State<Instrumentation>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], instrumentation.render())
}
