//! Unsubscribe service.
//!
//! # Architecture Overview
//!
//! ```text
//!     GET /unsubscribe?token=..&confirm=..
//!         │
//!         ▼
//!   ┌───────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────┐
//!   │ security  │──▶│   workflow   │──▶│    store     │   │  pages   │
//!   │rate limit │   │ verify token │   │ find / apply │   │ outcome  │
//!   └───────────┘   │ decide state │   └──────────────┘   │  → HTML  │
//!                   └──────┬───────┘                      └────▲─────┘
//!                          └───────────── Outcome ─────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;

use unsubscribe_service::config::{self, ServiceConfig};
use unsubscribe_service::lifecycle::{self, signals, Shutdown};
use unsubscribe_service::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "unsubscribe-service")]
#[command(about = "Serves signed unsubscribe links", long_about = None)]
struct Args {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long, env = "UNSUB_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config: ServiceConfig = config::load(args.config.as_deref())?;

    logging::init(&config.observability);
    tracing::info!("unsubscribe-service v{} starting", env!("CARGO_PKG_VERSION"));

    let secret = config::read_secret(&config.token)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        rate_limit_enabled = config.rate_limit.enabled,
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        request_timeout_secs = config.timeouts.request_secs,
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

    let bind_address = config.listener.bind_address.clone();
    let service = lifecycle::assemble(config, &secret)?;
    let shutdown = Shutdown::new();

    // Drop idle rate-limit windows so the map does not grow with every client seen.
    if let Some(limiter) = service.limiter.clone() {
        let mut stop = shutdown.subscribe();
        let window = Duration::from_secs(service.server.config().rate_limit.window_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(window);
            loop {
                tokio::select! {
                    _ = ticker.tick() => limiter.prune(std::time::Instant::now()),
                    _ = stop.recv() => break,
                }
            }
        });
    }

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let server_shutdown = shutdown.subscribe();
    let server = tokio::spawn(service.server.run(listener, server_shutdown));

    signals::wait_for_shutdown().await;
    shutdown.trigger();
    server.await??;

    if let Err(e) = service.store.save_to_file() {
        tracing::error!(error = %e, "Failed to save store snapshot on shutdown");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
