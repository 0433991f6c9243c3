//! vq-peer: shared video queue service
//!
//! Hosts one in-process session of queue peers behind an HTTP control
//! surface. Peers, devices and the network are simulated; the queue
//! protocol is the real one.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vq_common::config::{resolve_config_path, TomlConfig};
use vq_peer::api::{self, AppState};
use vq_peer::{PlayerId, Session, SimulatedDevice};

#[derive(Parser, Debug)]
#[command(name = "vq-peer")]
#[command(about = "Shared video queue peer service")]
#[command(version)]
struct Args {
    /// Config file path
    #[arg(short, long, env = "VQ_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP port (overrides the config file)
    #[arg(short, long, env = "VQ_PORT")]
    port: Option<u16>,

    /// Players to join at startup, in order; the first becomes the authority
    #[arg(long, value_delimiter = ',')]
    peers: Vec<PlayerId>,

    /// Players with elevated rights among the startup peers
    #[arg(long, value_delimiter = ',')]
    elevated: Vec<PlayerId>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let mut config = TomlConfig::load_or_default(config_path.as_deref())
        .context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }

    init_tracing(&config)?;

    info!(
        "Starting vq-peer v{} ({}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: built-in defaults"),
    }
    info!(
        "Queue capacity {}, per-user limit {} ({})",
        config.queue.capacity,
        config.queue.per_user_limit,
        if config.queue.per_user_limit_enabled {
            "enabled"
        } else {
            "disabled"
        }
    );

    let mut session = Session::from_config(&config);
    for id in &args.peers {
        session
            .join(
                *id,
                args.elevated.contains(id),
                SimulatedDevice::new(format!("player {}", id)),
            )
            .with_context(|| format!("Failed to join player {}", id))?;
    }
    session.pump();

    api::run(AppState::new(session, config.port), shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

/// RUST_LOG wins over the configured level; a log file adds a second layer
fn init_tracing(config: &TomlConfig) -> Result<()> {
    let level = &config.logging.level;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "vq_peer={0},vq_common={0},tower_http={0}",
            level
        ))
    });

    let file_layer = match &config.logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install signal handler: {}", e);
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
