//! JWT Pizza service with built-in telemetry.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────┐
//!   Request ─────▶│ http server → track_requests → capture_exchange  │──▶ handler
//!                 │                    │                 │            │
//!                 │                    ▼                 ▼            │
//!                 │             MetricsRegistry      LogShipper ──────┼──▶ logging.url
//!                 │                    │                              │
//!                 │                    ▼                              │
//!                 │   MetricsExporter (producers → MetricEncoder) ────┼──▶ metrics.url
//!                 │                                                   │
//!                 │   config watcher → ArcSwap<ServiceConfig>         │
//!                 └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use pizza_telemetry::config::{self, loader::load_config, ServiceConfig};
use pizza_telemetry::lifecycle::{signals, startup, Shutdown};
use pizza_telemetry::observability;
use pizza_telemetry::HttpServer;

#[derive(Parser)]
#[command(name = "pizza-telemetry")]
#[command(about = "JWT Pizza service with metrics export and log shipping", long_about = None)]
struct Cli {
    /// TOML configuration file; watched for changes while running.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    observability::init_tracing(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "pizza-telemetry starting");
    tracing::info!(
        bind_address = %config.server.bind_address,
        metrics_enabled = config.metrics.endpoint().is_some(),
        logging_enabled = config.logging.endpoint().is_some(),
        export_period_ms = config.metrics.export_period_ms,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let shared = config::shared(config.clone());
    let started = startup::start(shared, cli.config.as_deref(), &shutdown)?;

    let server = HttpServer::new(&config, &started.telemetry);
    let server_rx = shutdown.subscribe();
    let server_task = tokio::spawn(server.run(listener, server_rx));

    signals::wait_for_signal().await;
    shutdown.trigger();

    server_task.await??;
    let _ = started.exporter.await;

    tracing::info!("Shutdown complete");
    Ok(())
}
