//! gateward: a rate-limited reverse proxy / gateway.
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │                   GATEWARD                    │
//!                         │                                               │
//!   HTTP(S) clients ──────┼─▶ listener ─▶ admission ─▶ routes ─▶ client ──┼──▶ upstreams
//!                         │                  │                            │
//!   raw TCP clients ──────┼─▶ forwarder ─▶ admission ─▶ copy ─────────────┼──▶ upstream
//!                         │                  │                            │
//!                         │            rate limiters                      │
//!                         │        (per source address, LRU)              │
//!                         │                                               │
//!                         │   config · observability · admin · lifecycle  │
//!                         └──────────────────────────────────────────────┘
//! ```
//!
//! Admission control is per source address: IPv4 addresses are limited
//! individually, IPv6 addresses per /48, /56 and /64 prefix in parallel.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gateward::config::{load_config, GatewayConfig};
use gateward::admin::{admin_router, AdminState};
use gateward::http::HttpServer;
use gateward::lifecycle::{watch_signals, Shutdown};
use gateward::net::Forwarder;
use gateward::observability::metrics;
use gateward::ratelimit::LimiterRegistry;

#[derive(Parser)]
#[command(name = "gateward")]
#[command(about = "Rate-limited reverse proxy / gateway", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply if omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("gateward={}", config.observability.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "gateward starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        forwards = config.forwards.len(),
        rate_limits = config.rate_limits.len(),
        "Configuration loaded"
    );

    let registry = Arc::new(LimiterRegistry::from_config(&config.rate_limits));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    tokio::spawn(watch_signals(shutdown.clone()));

    // Raw TCP forwarders.
    let connect_timeout = Duration::from_secs(config.timeouts.connect_secs);
    for fwd_config in &config.forwards {
        let limiter = fwd_config
            .rate_limit
            .as_deref()
            .and_then(|name| registry.get(name));
        let forwarder = Forwarder::new(fwd_config.clone(), limiter, connect_timeout);
        let rx = shutdown.subscribe();
        let addr = fwd_config.bind_address.clone();
        tokio::spawn(async move {
            if let Err(e) = forwarder.run(rx).await {
                tracing::error!(address = %addr, error = %e, "Raw forwarder failed");
            }
        });
    }

    // Admin endpoint.
    if config.admin.enabled {
        let state = AdminState {
            api_key: Arc::from(config.admin.api_key.as_str()),
            registry: registry.clone(),
        };
        let app = admin_router(state);
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %config.admin.bind_address, "Admin endpoint listening");
        let mut rx = shutdown.subscribe();
        tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = rx.recv().await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "Admin endpoint failed");
            }
        });
    }

    // HTTP(S) server, on the main task.
    let limiter = config
        .listener
        .rate_limit
        .as_deref()
        .and_then(|name| registry.get(name));
    let server = HttpServer::new(&config, limiter)?;

    match &config.listener.tls {
        Some(tls) => {
            let addr = config.listener.bind_address.parse()?;
            server.run_tls(addr, tls, shutdown.subscribe()).await?;
        }
        None => {
            let listener = TcpListener::bind(&config.listener.bind_address).await?;
            server.run(listener, shutdown.subscribe()).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
