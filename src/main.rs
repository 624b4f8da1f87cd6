//! NATS HTTP gateway binary.
//!
//! This is an HTTP front door for core NATS messaging that:
//! - Connects to NATS once at startup and shares the connection
//! - Bridges HTTP verbs onto the bus (GET stream, POST request, PUT publish)
//! - Exposes health/ready endpoints for Kubernetes
//! - Exports Prometheus metrics for observability

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use nats_http_gateway::{router, AppState, GatewayConfig, GatewayMetrics, NatsBus};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first to get log level
    let config = GatewayConfig::from_env()?;

    // Initialize tracing with configured log level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("nats_http_gateway={}", config.log_level).parse()?)
                .add_directive("async_nats=warn".parse()?),
        )
        .json()
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.http_port,
        "Starting NATS HTTP gateway"
    );

    let metrics = GatewayMetrics::new();
    info!("Prometheus metrics initialized");

    // The gateway is useless without its bus, so a failed connection is fatal
    let bus = NatsBus::connect(&config.nats_url).await?;
    metrics.set_bus_connected(true);

    let state = AppState {
        bus: Arc::new(bus.clone()),
        metrics,
    };
    let app = router(state);

    let addr: SocketAddr = ([0, 0, 0, 0], config.http_port).into();
    info!(port = config.http_port, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let http_server = axum::serve(listener, app);

    tokio::select! {
        result = http_server => {
            if let Err(e) = result {
                error!(error = %e, "HTTP server error");
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    // Graceful shutdown
    info!("Shutting down gateway...");
    bus.close().await;
    info!("Gateway shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
