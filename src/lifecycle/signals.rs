//! OS signal handling.
//!
//! SIGINT (ctrl-c) and, on unix, SIGTERM both request a graceful shutdown.

use tokio::signal;

/// Wait for the first shutdown signal and return its name.
///
/// If a handler cannot be installed, that signal is never reported rather
/// than failing the server.
pub async fn wait_for_signal() -> &'static str {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => "SIGINT",
            Err(err) => {
                tracing::warn!(error = %err, "ctrl_c_handler_unavailable");
                std::future::pending().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                "SIGTERM"
            }
            Err(err) => {
                tracing::warn!(error = %err, "sigterm_handler_unavailable");
                std::future::pending().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&'static str>();

    tokio::select! {
        name = ctrl_c => name,
        name = terminate => name,
    }
}
