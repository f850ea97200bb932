//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Service metadata shown in the API schema.
    pub service: ServiceConfig,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Service identity. Display-only; nothing functional depends on it.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub version: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "app-api".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Minimum log severity (trace, debug, info, warn, error).
    pub log_level: String,

    /// Metrics exposition settings.
    pub metrics: MetricsConfig,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics: MetricsConfig::default(),
        }
    }
}

/// Prometheus exposition settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Path the exposition endpoint is mounted on.
    pub path: String,

    /// Buckets (seconds) for `http_request_duration_seconds`.
    pub duration_buckets: Vec<f64>,

    /// Buckets (seconds) for the unlabelled `http_request_duration_highr_seconds`.
    pub highr_buckets: Vec<f64>,

    /// Seconds between recorder upkeep runs.
    pub upkeep_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            path: "/metrics".to_string(),
            duration_buckets: vec![0.1, 0.5, 1.0],
            highr_buckets: vec![
                0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5,
                4.0, 4.5, 5.0, 7.5, 10.0, 30.0, 60.0,
            ],
            upkeep_interval_secs: 5,
        }
    }
}
