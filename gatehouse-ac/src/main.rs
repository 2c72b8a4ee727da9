//! gatehouse-ac - access controller daemon
//!
//! Bridges RFID reader channels to the resident document store:
//! validates scan lines, gates tags through per-channel cooldowns,
//! resolves them against resident records with bounded retries, writes
//! the audit trail, and answers each reader over its own channel. A
//! read-only HTTP surface exposes health, status, and the SSE event
//! stream for the dashboard.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use gatehouse_ac::api;
use gatehouse_ac::channel::dispatcher::{spawn_channel, Pipeline};
use gatehouse_ac::channel::Channel;
use gatehouse_ac::config::Config;
use gatehouse_ac::heartbeat;
use gatehouse_ac::state::SharedState;
use gatehouse_ac::store;
use gatehouse_common::GateEvent;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for gatehouse-ac
#[derive(Parser, Debug)]
#[command(name = "gatehouse-ac")]
#[command(about = "Gated-community access controller")]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(
        short,
        long,
        default_value = "gatehouse.toml",
        env = "GATEHOUSE_CONFIG"
    )]
    config: PathBuf,

    /// Override the status API port from the config file
    #[arg(short, long, env = "GATEHOUSE_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatehouse_ac=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!(
        "Starting Gatehouse access controller v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let api_port = args.port.unwrap_or(config.api.port);

    let store = store::build_store(&config.store).context("initializing document store")?;

    // Open every configured channel. A failed endpoint leaves the
    // channel registered but offline; the daemon keeps serving the
    // others and /status reports the gap until the next restart.
    let cooldown = config.pipeline.cooldown();
    let mut channels = Vec::with_capacity(config.channels.len());
    let mut readers = Vec::with_capacity(config.channels.len());
    for channel_config in &config.channels {
        match channel_config.endpoint.open().await {
            Ok((reader, writer)) => {
                info!(
                    channel = %channel_config.name,
                    endpoint = %channel_config.endpoint,
                    kind = %channel_config.kind,
                    "Channel transport open"
                );
                channels.push(Channel::new(channel_config, cooldown, Some(writer)));
                readers.push(Some(reader));
            }
            Err(e) => {
                warn!(
                    channel = %channel_config.name,
                    endpoint = %channel_config.endpoint,
                    "Channel unavailable until restart: {}",
                    e
                );
                channels.push(Channel::new(channel_config, cooldown, None));
                readers.push(None);
            }
        }
    }

    let state = Arc::new(SharedState::new(channels.clone()));
    let pipeline = Arc::new(Pipeline::new(store, &config.pipeline, state.clone()));

    for (channel, reader) in channels.into_iter().zip(readers) {
        if let Some(reader) = reader {
            state.broadcast_event(GateEvent::ChannelOnline {
                channel: channel.name().to_string(),
                timestamp: Utc::now(),
            });
            spawn_channel(channel, reader, pipeline.clone());
        }
    }

    tokio::spawn(heartbeat::heartbeat_task(
        state.clone(),
        config.pipeline.heartbeat(),
    ));

    // Status API
    let app = api::create_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], api_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Status API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
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
