//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events  → logging.rs (one JsonLayer, stdout)
//!                           → record.rs (event → one JSON line)
//!     → request timings → metrics.rs (Prometheus recorder)
//!
//! Consumers:
//!     → Log aggregation (stdout only)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing, fixed base schema
//! - Logging and metrics are explicit values built once at startup
//! - Panics are captured with their backtrace for the error boundary

pub mod logging;
pub mod metrics;
pub mod panic;
pub mod record;

pub use logging::{JsonLayer, LoggingError, LoggingHandle};
pub use metrics::{Instrumentation, MetricsError};
pub use record::LogRecord;
