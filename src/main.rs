//! Storage gateway
//!
//! A resilient HTTP gateway in front of interchangeable storage services.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌───────────────────────────────────────────────┐
//!                         │                 STORAGE GATEWAY               │
//!                         │                                               │
//!    Client Request       │  ┌─────────┐   ┌───────────┐   ┌───────────┐  │
//!    ─────────────────────┼─▶│  http   │──▶│  load     │──▶│ upstream  │──┼──▶ Storage
//!                         │  │ server  │   │ balancer  │   │  client   │  │    Service
//!                         │  └────┬────┘   └─────┬─────┘   └───────────┘  │
//!                         │       │ fallback     │ healthy only           │
//!                         │  ┌────▼────┐   ┌─────┴─────┐                  │
//!                         │  │  cache  │   │ registry  │◀─────────┐       │
//!                         │  └─────────┘   └───────────┘          │       │
//!                         │                                       │       │
//!                         │  ┌─────────────────┐  ┌────────────────┴────┐  │
//!                         │  │ health monitor  │  │ recovery prober     │  │
//!                         │  │ (CLOSED probes) │  │ (OPEN → HALF-OPEN)  │  │
//!                         │  └────────┬────────┘  └─────────┬───────────┘  │
//!                         │           └──── notifier ◀──────┘              │
//!                         └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use storage_gateway::config::loader::load_config;
use storage_gateway::lifecycle::wait_for_signal;
use storage_gateway::observability::{logging, metrics};
use storage_gateway::{GatewayConfig, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "storage-gateway")]
#[command(about = "Resilient gateway for storage services", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability);

    tracing::info!("storage-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backends = config.backends.len(),
        health_interval_ms = config.health_check.interval_ms,
        recovery_timeout_ms = config.circuit_breaker.recovery_timeout_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.trigger();
    });

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
