//! Room relay (wsp-relay) - Main entry point
//!
//! Serves the room WebSocket endpoints that players join, plus snapshot and
//! observer routes.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wsp_common::config::TomlConfig;
use wsp_relay::api::{create_router, AppContext};
use wsp_relay::RoomRegistry;

/// Command-line arguments for wsp-relay
#[derive(Parser, Debug)]
#[command(name = "wsp-relay")]
#[command(about = "Room relay for Web-SyncPlay")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "WSP_RELAY_PORT")]
    port: Option<u16>,

    /// Address to bind (overrides the config file)
    #[arg(long, env = "WSP_RELAY_HOST")]
    host: Option<String>,

    /// Config file path
    #[arg(short, long, env = "WSP_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("wsp_relay={},tower_http=info", config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let host = args.host.unwrap_or(config.relay.host);
    let port = args.port.unwrap_or(config.relay.port);
    let ip: IpAddr = host
        .parse()
        .with_context(|| format!("Invalid bind address {}", host))?;
    let addr = SocketAddr::new(ip, port);

    info!("Starting wsp-relay on {}", addr);

    let registry = Arc::new(RoomRegistry::default());
    let app = create_router(AppContext::new(registry));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Relay shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
