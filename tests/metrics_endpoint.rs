//! Metrics exposition and API schema.

use app_api::config::AppConfig;
use app_api::http::{app_router, HandlerError};
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    routing::{get as get_route, post},
};
use serde_json::Value;

mod common;

use common::{get, instrumented, send, LogCapture};

async fn echo(body: String) -> String {
    body
}

async fn failing() -> Result<&'static str, HandlerError> {
    Err(HandlerError::msg("backend unavailable"))
}

fn counter_line<'a>(text: &'a str, handler: &str) -> Option<&'a str> {
    sample_line(text, "http_requests_total{", handler)
}

fn sample_line<'a>(text: &'a str, prefix: &str, handler: &str) -> Option<&'a str> {
    let needle = format!("handler=\"{handler}\"");
    text.lines()
        .find(|line| line.starts_with(prefix) && line.contains(&needle))
}

fn sample_value(line: &str) -> f64 {
    line.rsplit(' ').next().unwrap().parse().unwrap()
}

#[tokio::test]
async fn metrics_endpoint_serves_prometheus_text() {
    let app = app_router(&AppConfig::default()).unwrap();
    get(&app, "/health").await;
    get(&app, "/health").await;

    let res = get(&app, "/metrics").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(
        res.headers["content-type"],
        "text/plain; version=0.0.4; charset=utf-8"
    );

    let text = res.text();
    let line = counter_line(&text, "/health").expect("health requests counted");
    assert!(line.contains("method=\"GET\""));
    assert!(line.contains("status=\"2xx\""));
    assert!(line.ends_with(" 2"), "{line}");
    assert!(text.contains("http_request_duration_seconds_bucket"));
    assert!(text.contains("http_request_duration_highr_seconds_count"));
}

#[tokio::test]
async fn request_and_response_sizes_are_recorded() {
    let app = instrumented().route("/echo", &[Method::POST], post(echo)).build();
    for _ in 0..2 {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/echo")
            .header("content-length", "11")
            .body(Body::from("hello world"))
            .unwrap();
        let res = send(&app, request).await;
        assert_eq!(res.text(), "hello world");
    }

    let text = get(&app, "/metrics").await.text();
    let count = sample_line(&text, "http_request_size_bytes_count{", "/echo").expect("request sizes");
    assert_eq!(sample_value(count), 2.0);
    let sum = sample_line(&text, "http_request_size_bytes_sum{", "/echo").expect("request size sum");
    assert_eq!(sample_value(sum), 22.0);

    let count = sample_line(&text, "http_response_size_bytes_count{", "/echo").expect("response sizes");
    assert_eq!(sample_value(count), 2.0);
    let sum = sample_line(&text, "http_response_size_bytes_sum{", "/echo").expect("response size sum");
    assert_eq!(sample_value(sum), 22.0);
}

#[tokio::test]
async fn failures_and_unmatched_paths_are_counted() {
    let app = instrumented().get("/boom", failing).build();
    get(&app, "/boom").await;
    get(&app, "/missing").await;

    let text = get(&app, "/metrics").await.text();
    let boom = counter_line(&text, "/boom").expect("failing route counted");
    assert!(boom.contains("status=\"5xx\""));
    let missing = counter_line(&text, "none").expect("unmatched path counted");
    assert!(missing.contains("status=\"4xx\""));
}

#[tokio::test]
async fn metrics_requests_go_through_the_request_log() {
    let logs = LogCapture::default();
    let _guard = logs.install();
    let app = app_router(&AppConfig::default()).unwrap();

    get(&app, "/metrics").await;

    let events = logs.request_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["path"], "/metrics");
    assert_eq!(events[0]["status_code"], 200);
}

#[tokio::test]
async fn metrics_path_is_configurable() {
    let mut config = AppConfig::default();
    config.observability.metrics.path = "/internal/metrics".into();
    let app = app_router(&config).unwrap();

    assert_eq!(get(&app, "/internal/metrics").await.status, StatusCode::OK);
    assert_eq!(get(&app, "/metrics").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn schema_lists_documented_routes_only() {
    let app = app_router(&AppConfig::default()).unwrap();

    let res = get(&app, "/openapi.json").await;
    assert_eq!(res.status, StatusCode::OK);

    let schema = res.json();
    assert_eq!(schema["info"]["title"], "app-api");
    assert_eq!(schema["info"]["version"], env!("CARGO_PKG_VERSION"));

    let paths: Vec<&String> = schema["paths"].as_object().unwrap().keys().collect();
    assert_eq!(paths, vec!["/health"]);
    assert_eq!(schema["paths"]["/health"]["get"]["summary"], "Health");
    assert!(schema["paths"].get("/metrics").is_none());
    assert!(schema["paths"].get("/openapi.json").is_none());
}

#[tokio::test]
async fn hidden_routes_are_served_but_not_documented() {
    let app = instrumented()
        .get("/visible", || async { "yes" })
        .route_hidden("/internal", get_route(|| async { "hidden" }))
        .build();

    assert_eq!(get(&app, "/internal").await.text(), "hidden");

    let schema: Value = get(&app, "/openapi.json").await.json();
    assert!(schema["paths"].get("/visible").is_some());
    assert!(schema["paths"].get("/internal").is_none());
}
