//! Broadcaster Daemon - SSE Fan-Out Server
//!
//! Serves the broadcaster over HTTP: clients hold open
//! `GET {prefix}/subscribe` streams and anything posted to
//! `POST {prefix}/dispatch?data=...` is pushed to all of them.
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults (0.0.0.0:8080, prefix /sse)
//! broadcaster-daemon
//!
//! # Custom address and buffer size
//! broadcaster-daemon --bind 127.0.0.1:9000 --buffer-capacity 500
//!
//! # With config file
//! broadcaster-daemon --config /etc/sse-broadcaster/broadcaster.toml
//!
//! # Verbose logging
//! RUST_LOG=debug broadcaster-daemon
//! ```
//!
//! # Signals
//!
//! - `SIGTERM` / `SIGINT`: Graceful shutdown (open streams are ended)

mod server;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use broadcaster_core::{load_config, load_config_from_path, BroadcasterConfig, ConfigOverrides};
use server::{wait_for_signal, BroadcastServer};

/// Broadcaster Daemon - push dispatched events to every SSE subscriber
#[derive(Parser, Debug)]
#[command(name = "broadcaster-daemon")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "BROADCASTER_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(short = 'b', long, value_name = "ADDR")]
    bind: Option<SocketAddr>,

    /// Path prefix for the subscribe and dispatch routes
    #[arg(long, value_name = "PREFIX")]
    route_prefix: Option<String>,

    /// Per-subscriber buffer capacity
    #[arg(long, value_name = "N")]
    buffer_capacity: Option<usize>,

    /// Idle seconds before a keepalive is sent
    #[arg(long, value_name = "SECS")]
    keepalive_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "BROADCASTER_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            bind_addr: self.bind,
            route_prefix: self.route_prefix.clone(),
            buffer_capacity: self.buffer_capacity,
            keepalive_secs: self.keepalive_secs,
        }
    }
}

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "broadcaster_daemon={level},broadcaster_core={level},tower_http=warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Load file/env configuration, then apply the command line on top
fn resolve_config(args: &Args) -> Result<BroadcasterConfig> {
    let mut config = match &args.config {
        Some(path) => load_config_from_path(Some(path.clone()))
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => load_config().context("Failed to load config")?,
    };

    args.overrides()
        .apply(&mut config)
        .context("Invalid command-line configuration")?;

    info!(
        source = %config.source(),
        file = ?config.config_file_path,
        "Configuration resolved"
    );
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!(pid = std::process::id(), "Starting Broadcaster Daemon");

    let config = resolve_config(&args)?;
    let shutdown = CancellationToken::new();

    let server = BroadcastServer::new(config, shutdown.clone());
    let listener = server.bind().await?;

    tokio::spawn(wait_for_signal(shutdown));

    server.serve(listener).await?;

    info!("Broadcaster Daemon stopped");
    Ok(())
}
