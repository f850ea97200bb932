//! Liveness probe.
//!
//! `GET /health` always answers `{"status": "ok"}` and logs
//! `health_check_called`; the request middleware logs its own line on top.

use axum::Json;
use serde::Serialize;

pub const HEALTH_PATH: &str = "/health";

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
}

pub async fn health() -> Json<HealthStatus> {
    tracing::info!("health_check_called");
    Json(HealthStatus { status: "ok" })
}
