//! Request middleware.
//!
//! Layering, outermost first:
//! ```text
//! track_metrics → request_log → route handler
//! ```

pub mod request_log;

pub use request_log::request_log;
