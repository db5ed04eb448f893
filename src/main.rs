//! QA relay (v1)
//!
//! HTTP relay between the QA manager front end and third-party APIs.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌────────────────────────────────────────────────────┐
//!                         │                      QA RELAY                      │
//!                         │                                                    │
//!     Browser request     │  ┌─────────┐   ┌──────────┐   ┌────────────────┐   │
//!     ────────────────────┼─▶│  http   │──▶│  relay   │──▶│     proxy      │───┼──▶ Slack
//!                         │  │ + cors  │   │ services │   │ breaker/cache/ │   │    BrowserStack
//!                         │  └─────────┘   └──────────┘   │ retry/timeout  │   │    any HTTP API
//!     JSON response       │                               └────────────────┘   │
//!     ◀───────────────────┼──────────────────────────────────────────────────  │
//!                         │                                                    │
//!                         │  config · observability · lifecycle · resilience   │
//!                         └────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use qa_relay::config;
use qa_relay::lifecycle::{shutdown_on_signal, Shutdown};
use qa_relay::observability::{logging, metrics};
use qa_relay::HttpServer;

#[derive(Parser)]
#[command(name = "qa-relay")]
#[command(about = "Resilient relay between the QA manager and third-party APIs", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults plus environment when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref())?;

    logging::init_logging(&config.observability)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "qa-relay starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_ms = config.proxy.timeout_ms,
        max_body_size = config.security.max_body_size,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let shutdown_rx = shutdown.subscribe();
    tokio::spawn(shutdown_on_signal(shutdown));

    server.run(listener, shutdown_rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
