//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

use app_api::config::{MetricsConfig, ServiceConfig};
use app_api::http::{AppBuilder, InstrumentedApp};
use app_api::observability::{logging, Instrumentation};
use axum::{
    body::{to_bytes, Body, Bytes},
    http::{HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use tracing::dispatcher::DefaultGuard;
use tracing_subscriber::filter::LevelFilter;

/// In-memory sink for the JSON logging pipeline.
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    /// Route this thread's events into the capture until the guard drops.
    pub fn install(&self) -> DefaultGuard {
        let writer = self.clone();
        tracing::dispatcher::set_default(&logging::dispatch(
            move || writer.clone(),
            LevelFilter::INFO,
        ))
    }

    /// Every captured line, each parsed as JSON.
    pub fn lines(&self) -> Vec<Value> {
        let raw = String::from_utf8(self.buffer.lock().unwrap().clone()).unwrap();
        raw.lines()
            .map(|line| serde_json::from_str(line).unwrap_or_else(|e| panic!("invalid JSON line {line:?}: {e}")))
            .collect()
    }

    pub fn with_message(&self, message: &str) -> Vec<Value> {
        self.lines()
            .into_iter()
            .filter(|line| line["message"] == message)
            .collect()
    }

    /// `request_handled` and `unhandled_exception` lines, in order.
    pub fn request_events(&self) -> Vec<Value> {
        self.lines()
            .into_iter()
            .filter(|line| line["message"] == "request_handled" || line["message"] == "unhandled_exception")
            .collect()
    }
}

/// Application with default instrumentation attached and no routes yet.
pub fn instrumented() -> InstrumentedApp {
    let instrumentation = Instrumentation::new(&MetricsConfig::default()).unwrap();
    AppBuilder::new(&ServiceConfig::default()).instrument(instrumentation)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).unwrap()
    }
}

/// Drive `request` through the router in-process.
pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    TestResponse { status, headers, body }
}

pub async fn get(app: &Router, uri: &str) -> TestResponse {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Asserts the fields every request event carries.
pub fn assert_request_event(event: &Value, path: &str, method: &str) {
    assert!(event["timestamp"].is_string(), "timestamp in {event}");
    assert!(event["level"].is_string(), "level in {event}");
    assert_eq!(event["path"], path);
    assert_eq!(event["method"], method);

    let duration = event["duration_ms"].as_f64().expect("duration_ms is a number");
    assert!(duration >= 0.0);
    assert_eq!((duration * 100.0).round() / 100.0, duration, "two decimals: {duration}");
}
