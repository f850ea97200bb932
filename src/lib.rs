//! HTTP service skeleton with structured request logging and Prometheus
//! metrics.

// Core subsystems
pub mod config;
pub mod health;
pub mod http;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::AppConfig;
pub use http::{AppBuilder, HandlerError, HttpServer};
pub use lifecycle::Shutdown;
