//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum serve, peer address, graceful shutdown)
//!     → track_metrics (observability::metrics)
//!     → middleware/request_log.rs (timing, logging, error boundary)
//!     → route handler (health, metrics exposition, schema)
//!     → response.rs (generic error bodies)
//! ```

pub mod builder;
pub mod middleware;
pub mod response;
pub mod schema;
pub mod server;

pub use builder::{AppBuilder, InstrumentedApp};
pub use response::HandlerError;
pub use server::{app_router, HttpServer};
