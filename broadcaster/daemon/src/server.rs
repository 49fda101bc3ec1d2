//! Daemon Server Implementation
//!
//! Binds the HTTP listener, serves the broadcaster router until shutdown and
//! runs the periodic subscriber-count reporter alongside it.
//!
//! ```text
//!                 BroadcastServer
//!                        │
//!        ┌───────────────┼────────────────┐
//!        │               │                │
//!   axum::serve    count reporter    open streams
//!        │               │                │
//!        └───────── CancellationToken ────┘
//!                 (cancelled on SIGINT/SIGTERM)
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace};

use broadcaster_core::{build_router, AppState, BroadcasterConfig, Registry};

/// The HTTP server process
pub struct BroadcastServer {
    state: AppState,
}

impl BroadcastServer {
    /// Create a server around a fresh registry
    pub fn new(config: BroadcasterConfig, shutdown: CancellationToken) -> Self {
        Self {
            state: AppState::new(config, shutdown),
        }
    }

    /// Shared handler state
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Bind the configured listen address
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.state.config.bind_addr;
        TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind HTTP listener on {addr}"))
    }

    /// Serve requests until the shutdown token is cancelled
    ///
    /// Open event streams are ended through the same token, so graceful
    /// shutdown does not wait on idle subscribers.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let shutdown = self.state.shutdown.clone();
        let config = &self.state.config;

        let local_addr = listener.local_addr().context("Listener has no local address")?;
        let reporter = spawn_count_reporter(
            self.state.registry.clone(),
            config.count_report_interval,
            shutdown.clone(),
        );

        info!(
            addr = %local_addr,
            prefix = %config.route_prefix,
            buffer_capacity = config.buffer_capacity,
            keepalive_secs = config.keepalive_interval.as_secs(),
            "Ready to accept connections"
        );

        let router = build_router(self.state.clone());
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .context("HTTP server error");

        self.state.shutdown.cancel();
        if let Some(handle) = reporter {
            join_reporter(handle).await;
        }

        info!(
            remaining_subscribers = self.state.registry.count(),
            "HTTP server stopped"
        );
        result
    }
}

/// Tracks the last reported subscriber count
#[derive(Debug, Default)]
struct CountReport {
    last: Option<usize>,
}

impl CountReport {
    /// Record a new count; true if it differs from the previous one
    fn observe(&mut self, count: usize) -> bool {
        let changed = self.last != Some(count);
        self.last = Some(count);
        changed
    }
}

/// Periodically log the number of subscribers
///
/// Returns `None` when `interval` is zero, which disables reporting.
pub fn spawn_count_reporter(
    registry: Registry,
    interval: Duration,
    shutdown: CancellationToken,
) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut report = CountReport::default();

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let subscribers = registry.count();
                    if report.observe(subscribers) {
                        info!(subscribers, "Subscriber count changed");
                    } else {
                        trace!(subscribers, "Subscriber count");
                    }
                }
            }
        }
    }))
}

/// Wait for the count reporter to stop; false if it panicked or was aborted
async fn join_reporter(handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Count reporter task failed");
            false
        }
    }
}

/// Resolve once SIGINT or SIGTERM arrives, then cancel `shutdown`
pub async fn wait_for_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
        () = shutdown.cancelled() => return,
    }

    shutdown.cancel();
}
