//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Assemble the application router (instrumentation first, then routes)
//! - Serve it with peer addresses attached for `client_ip`
//! - Emit the lifecycle events around the serving loop
//! - Keep metrics upkeep running for as long as the server serves
//! - Drain in-flight requests on shutdown

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::health::{health, HEALTH_PATH};
use crate::http::builder::AppBuilder;
use crate::lifecycle::signals;
use crate::observability::metrics::{Instrumentation, MetricsError};

/// Build the service's router from configuration.
pub fn app_router(config: &AppConfig) -> Result<Router, MetricsError> {
    let instrumentation = Instrumentation::new(&config.observability.metrics)?;
    Ok(routes(config, instrumentation))
}

fn routes(config: &AppConfig, instrumentation: Instrumentation) -> Router {
    AppBuilder::new(&config.service)
        .instrument(instrumentation)
        .get(HEALTH_PATH, health)
        .build()
}

/// HTTP server for the service.
pub struct HttpServer {
    router: Router,
    instrumentation: Instrumentation,
    config: AppConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Fails if the metrics recorder cannot be built.
    pub fn new(config: AppConfig) -> Result<Self, MetricsError> {
        let instrumentation = Instrumentation::new(&config.observability.metrics)?;
        let router = routes(&config, instrumentation.clone());
        Ok(Self {
            router,
            instrumentation,
            config,
        })
    }

    /// Run the server, accepting connections on the given listener until a
    /// signal arrives or `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            service = %self.config.service.name,
            version = %self.config.service.version,
            "startup_complete"
        );

        let (stop_upkeep, upkeep_rx) = broadcast::channel(1);
        let upkeep = self.instrumentation.spawn_upkeep(upkeep_rx);

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await;

        drop(stop_upkeep);
        if let Err(err) = upkeep.await {
            tracing::warn!(error = %err, "metrics_upkeep_failed");
        }
        served?;

        tracing::info!("shutdown_complete");
        Ok(())
    }

    /// Metrics recorder shared by every route of this server.
    pub fn instrumentation(&self) -> &Instrumentation {
        &self.instrumentation
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

async fn shutdown_signal(mut shutdown: broadcast::Receiver<()>) {
    tokio::select! {
        signal = signals::wait_for_signal() => {
            tracing::info!(signal, "shutdown_signal_received");
        }
        _ = requested(&mut shutdown) => {
            tracing::info!("shutdown_requested");
        }
    }
}

/// Resolves when a shutdown is broadcast. A closed channel never resolves,
/// leaving OS signals as the only trigger.
async fn requested(shutdown: &mut broadcast::Receiver<()>) {
    if let Err(broadcast::error::RecvError::Closed) = shutdown.recv().await {
        std::future::pending::<()>().await;
    }
}
