//! Same-origin HTTP relay (v1)
//!
//! Lets a sandboxed client reach arbitrary hosts through one trusted,
//! same-origin endpoint.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌───────────────────────────────────────────────┐
//!                          │                    RELAY                      │
//!   GET /proxy?<encoded>   │  ┌─────────┐   ┌───────────┐   ┌──────────┐   │
//!  ────────────────────────┼─▶│  http   │──▶│ translate │──▶│ executor │───┼──▶ Target
//!                          │  │ server  │   │ (headers, │   │ (reqwest)│   │    host
//!                          │  └─────────┘   │  body)    │   └────┬─────┘   │
//!                          │                └───────────┘        │         │
//!                          │                                     ▼         │
//!   content-type + body    │  ┌──────────┐          ┌──────────────────┐   │
//!  ◀───────────────────────┼──│ response │◀─────────│ growable buffer  │◀──┼─── body
//!                          │  └──────────┘          └──────────────────┘   │
//!                          └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use same_origin_relay::config::{load_config, validate_config, ConfigError, RelayConfig};
use same_origin_relay::lifecycle::{shutdown_on_signal, Shutdown};
use same_origin_relay::observability::{logging, metrics};
use same_origin_relay::RelayServer;

#[derive(Parser)]
#[command(name = "same-origin-relay")]
#[command(about = "Same-origin HTTP relay for sandboxed clients", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    logging::init_logging(&config.observability)?;
    tracing::info!("same-origin-relay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        path = %config.relay.path,
        initial_buffer_size = config.relay.initial_buffer_size,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = RelayServer::new(config)?;
    let server_shutdown = shutdown.subscribe();
    let mut server_task = tokio::spawn(async move { server.run(listener, server_shutdown).await });

    tokio::select! {
        result = &mut server_task => {
            // Server stopped without being asked to.
            result??;
            return Ok(());
        }
        _ = shutdown_on_signal(&shutdown) => {}
    }
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
