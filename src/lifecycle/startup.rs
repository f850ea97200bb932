//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Install logging before anything else can log
//! - Build the instrumented application
//! - Bind the listener last, so traffic only arrives when ready
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently

use tokio::net::TcpListener;

use crate::config::validation::validate_config;
use crate::config::{AppConfig, ConfigError};
use crate::http::HttpServer;
use crate::observability::logging::{self, LoggingError, LoggingHandle};
use crate::observability::metrics::MetricsError;

/// Any failure that prevents the service from serving.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("logging: {0}")]
    Logging(#[from] LoggingError),

    #[error("metrics: {0}")]
    Metrics(#[from] MetricsError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Everything needed to start serving.
pub struct Prepared {
    pub server: HttpServer,
    pub listener: TcpListener,
    pub logging: LoggingHandle,
}

/// Run the startup sequence. Call once per process.
pub async fn prepare(config: AppConfig) -> Result<Prepared, StartupError> {
    validate_config(&config).map_err(ConfigError::Validation)?;

    let logging = logging::init(&config.observability)?;
    let server = HttpServer::new(config)?;

    let address = server.config().listener.bind_address.clone();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;

    Ok(Prepared {
        server,
        listener,
        logging,
    })
}
