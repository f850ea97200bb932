//! Structured logging.
//!
//! # Responsibilities
//! - Build the one subscriber: a level filter plus a [`JsonLayer`]
//! - Install it process-wide, exactly once, returning an explicit handle
//! - Let tests and embedders scope the same pipeline to any writer
//!
//! # Design Decisions
//! - Uses the tracing crate; every component logs through its macros
//! - A single layer writes each event once, so nothing is emitted twice
//! - Writes are best-effort: a failing sink never fails the caller

use std::io::Write;
use std::str::FromStr;

use tracing::{Dispatch, Event, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Registry;

use crate::config::ObservabilityConfig;
use crate::observability::record::LogRecord;

/// Errors raised while installing logging.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("unknown log level `{0}`")]
    InvalidLevel(String),

    #[error("logging has already been initialized for this process")]
    AlreadyInitialized,
}

/// `tracing_subscriber` layer that renders every event as one JSON line.
pub struct JsonLayer<W> {
    make_writer: W,
}

impl<W> JsonLayer<W>
where
    W: for<'w> MakeWriter<'w> + 'static,
{
    pub fn new(make_writer: W) -> Self {
        Self { make_writer }
    }
}

impl<S, W> Layer<S> for JsonLayer<W>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut line = LogRecord::from_event(event).to_json_line();
        line.push('\n');

        let mut writer = self.make_writer.make_writer_for(event.metadata());
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }
}

/// Build the logging pipeline against `make_writer`.
pub fn subscriber<W>(make_writer: W, level: LevelFilter) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    Registry::default()
        .with(level)
        .with(JsonLayer::new(make_writer))
}

/// Same as [`subscriber`], wrapped in a [`Dispatch`] for scoped use.
pub fn dispatch<W>(make_writer: W, level: LevelFilter) -> Dispatch
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    Dispatch::new(subscriber(make_writer, level))
}

/// Proof that process-wide logging is installed.
///
/// Owning one means every `tracing` event in the process goes to stdout
/// through the JSON formatter.
#[derive(Clone)]
pub struct LoggingHandle {
    dispatch: Dispatch,
    level: LevelFilter,
}

impl LoggingHandle {
    pub fn level(&self) -> LevelFilter {
        self.level
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }
}

/// Install JSON logging to stdout as the global default.
///
/// Call exactly once at startup; a second call fails with
/// [`LoggingError::AlreadyInitialized`].
pub fn init(config: &ObservabilityConfig) -> Result<LoggingHandle, LoggingError> {
    let level = LevelFilter::from_str(&config.log_level)
        .map_err(|_| LoggingError::InvalidLevel(config.log_level.clone()))?;

    let dispatch = dispatch(std::io::stdout, level);
    tracing::dispatcher::set_global_default(dispatch.clone())
        .map_err(|_| LoggingError::AlreadyInitialized)?;

    Ok(LoggingHandle { dispatch, level })
}
