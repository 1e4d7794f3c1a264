//! Headless player (wsp-player) - Main entry point
//!
//! Joins a room on a relay and plays along with a simulated media element.
//! Useful for exercising a room from the command line and as a reference
//! for wiring the sync core into a real player.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wsp_common::config::TomlConfig;
use wsp_common::events::RoomEvent;
use wsp_player::config::{default_server_url, PlayerConfig};
use wsp_player::reconciler::PlayerOptions;
use wsp_player::simulated::SimulatedElement;
use wsp_player::transport::{ws, ChannelEmbedHost};
use wsp_player::{RoomSession, SessionHandle};

/// Command-line arguments for wsp-player
#[derive(Parser, Debug)]
#[command(name = "wsp-player")]
#[command(about = "Headless Web-SyncPlay room member")]
#[command(version)]
struct Args {
    /// Room to join
    #[arg(short, long, env = "WSP_ROOM")]
    room: String,

    /// Relay base url (defaults to the relay address from the config file)
    #[arg(short, long, env = "WSP_SERVER")]
    server: Option<String>,

    /// Config file path
    #[arg(short, long, env = "WSP_CONFIG")]
    config: Option<PathBuf>,

    /// Length in seconds of every simulated media item
    #[arg(long, default_value = "180")]
    duration: f64,

    /// Use native element controls instead of the player's own
    #[arg(long)]
    native_controls: bool,

    /// Print embedding notifications to stdout as JSON lines
    #[arg(long)]
    embedded: bool,

    /// Urls to append to the room queue after joining
    #[arg(short, long)]
    queue: Vec<String>,

    /// Url to play directly after joining
    #[arg(short, long)]
    play: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = PlayerConfig {
        server_url: args
            .server
            .clone()
            .unwrap_or_else(|| default_server_url(&toml_config.relay)),
        room_id: args.room.clone(),
        options: PlayerOptions {
            show_controls: !args.native_controls,
            embedded: args.embedded,
        },
        sync: toml_config.sync.clone(),
        media_duration_secs: args.duration,
    };
    config.validate().context("Invalid player configuration")?;

    info!("Starting wsp-player for room {}", config.room_id);

    let connection = ws::connect(&config.room_url())
        .await
        .context("Failed to join room")?;

    let mut transport = connection.adapter;
    if config.options.embedded {
        let host = ChannelEmbedHost::new(64);
        let mut notifications = host.subscribe();
        tokio::spawn(async move {
            while let Ok(notification) = notifications.recv().await {
                match serde_json::to_string(&notification) {
                    Ok(json) => println!("{}", json),
                    Err(e) => warn!("Failed to encode embed notification: {}", e),
                }
            }
        });
        transport = transport.with_embed_host(Box::new(host));
    }

    let session = RoomSession::new(
        config.options,
        &config.sync,
        transport,
        SimulatedElement::new(config.media_duration_secs),
    );

    let mut events = session.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            log_room_event(&event);
        }
    });

    let (handle, inputs) = SessionHandle::channel();
    queue_startup_commands(&handle, &args);

    let session = session
        .run(connection.inbound, inputs, shutdown_signal())
        .await;

    info!(
        "Left room at {} of {:?}",
        wsp_common::time::format_clock(session.state().position_secs()),
        session.state().url
    );
    Ok(())
}

fn queue_startup_commands(handle: &SessionHandle, args: &Args) {
    let commands = args
        .queue
        .iter()
        .map(|url| handle.add_to_queue(url.clone()))
        .chain(args.play.iter().map(|url| handle.play(url.clone())));
    for result in commands {
        if let Err(e) = result {
            error!("Startup command not delivered: {}", e);
        }
    }
}

fn log_room_event(event: &RoomEvent) {
    match event {
        RoomEvent::Resynced {
            from_played,
            to_played,
            drift_secs,
            ..
        } => info!(
            "Resynced {:.3} -> {:.3} (drift {:.2}s)",
            from_played, to_played, drift_secs
        ),
        RoomEvent::MediaLoaded { url, .. } => info!("Now playing {}", url),
        RoomEvent::QueueChanged {
            queue,
            queue_index,
            trigger,
            ..
        } => info!(
            "Queue {}: {} entries, index {}",
            trigger,
            queue.len(),
            queue_index
        ),
        RoomEvent::PlaybackEnded { outcome, .. } => info!("Playback ended: {}", outcome),
        RoomEvent::MediaError { message, .. } => warn!("Media error: {}", message),
        other => debug!("Room event: {}", other.event_type()),
    }
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
