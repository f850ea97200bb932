//! app-api: HTTP service skeleton.
//!
//! ```text
//!   Client ──▶ track_metrics ──▶ request_log ──▶ route ──┐
//!                                                      │
//!   Client ◀──────────── response (500 on failure) ◀───┘
//!
//!   stdout ◀── one JSON line per event
//!   /metrics ◀── Prometheus scrape
//! ```

use std::path::PathBuf;

use clap::Parser;

use app_api::config::{load_config, AppConfig};
use app_api::lifecycle::{prepare, Prepared, Shutdown};

#[derive(Parser)]
#[command(name = "app-api")]
#[command(about = "HTTP service with structured request logging and Prometheus metrics", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => load_config(&path)?,
        None => AppConfig::default(),
    };

    let Prepared {
        server,
        listener,
        logging: _logging,
    } = prepare(config).await?;

    let shutdown = Shutdown::new();
    server.run(listener, shutdown.subscribe()).await?;

    Ok(())
}
