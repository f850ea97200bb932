//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Install logging → Build app → Bind listener
//!
//! Serving (http::server):
//!     startup_complete → accept requests
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT or Shutdown::trigger → Stop accepting → Drain → shutdown_complete
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then logging, then app, listener last
//! - Fail fast: any startup error is fatal
//! - Requests cancelled mid-flight by shutdown are not logged

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{prepare, Prepared, StartupError};
