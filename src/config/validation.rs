//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, log levels and bucket layouts
//! - Detect metrics path collisions with built-in routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::str::FromStr;

use tracing_subscriber::filter::LevelFilter;

use crate::config::schema::AppConfig;
use crate::health::HEALTH_PATH;
use crate::http::schema::SCHEMA_PATH;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("service.name must not be empty")]
    EmptyServiceName,

    #[error("listener.bind_address `{0}` is not a socket address")]
    InvalidBindAddress(String),

    #[error("observability.log_level `{0}` is not a known level")]
    InvalidLogLevel(String),

    #[error("observability.metrics.path `{0}` must start with '/'")]
    RelativeMetricsPath(String),

    #[error("observability.metrics.path `{0}` collides with a built-in route")]
    ReservedMetricsPath(String),

    #[error("observability.metrics.{0} must be non-empty and strictly increasing")]
    InvalidBuckets(&'static str),

    #[error("observability.metrics.upkeep_interval_secs must be greater than zero")]
    ZeroUpkeepInterval,
}

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.service.name.trim().is_empty() {
        errors.push(ValidationError::EmptyServiceName);
    }

    if SocketAddr::from_str(&config.listener.bind_address).is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if LevelFilter::from_str(&config.observability.log_level).is_err() {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    let metrics = &config.observability.metrics;
    if !metrics.path.starts_with('/') {
        errors.push(ValidationError::RelativeMetricsPath(metrics.path.clone()));
    } else if metrics.path == HEALTH_PATH || metrics.path == SCHEMA_PATH {
        errors.push(ValidationError::ReservedMetricsPath(metrics.path.clone()));
    }

    if !strictly_increasing(&metrics.duration_buckets) {
        errors.push(ValidationError::InvalidBuckets("duration_buckets"));
    }
    if !strictly_increasing(&metrics.highr_buckets) {
        errors.push(ValidationError::InvalidBuckets("highr_buckets"));
    }
    if metrics.upkeep_interval_secs == 0 {
        errors.push(ValidationError::ZeroUpkeepInterval);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub(crate) fn strictly_increasing(buckets: &[f64]) -> bool {
    !buckets.is_empty()
        && buckets.iter().all(|b| b.is_finite())
        && buckets.windows(2).all(|w| w[0] < w[1])
}
