//! mreq-bot - chat song-request service
//!
//! Serves the dispatch API consumed by a chat adapter:
//! - `POST /dispatch` - handle one inbound message
//! - `GET /health` - liveness and diagnostics
//! - `GET /events` - SSE stream of bot activity

use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use mreq_common::config::{write_toml_config, BotConfig, ConfigResolver, LoggingConfig};
use mreq_common::events::EventBus;
use mreq_bot::dispatch::Dispatcher;
use mreq_bot::services::{MusicCatalogue, NeteaseClient};
use mreq_bot::session::SessionManager;
use mreq_bot::AppState;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const EVENT_BUS_CAPACITY: usize = 100;

/// Command-line arguments for mreq-bot
#[derive(Parser, Debug)]
#[command(name = "mreq-bot")]
#[command(about = "Chat song-request service")]
#[command(version)]
struct Args {
    /// Path to TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config and MREQ_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Write a default config file to the resolved config path and exit
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let resolver = ConfigResolver::new(args.config.clone());

    if args.init_config {
        let path = resolver
            .config_path()
            .context("Could not determine config path; pass --config")?;
        write_toml_config(&BotConfig::default(), &path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    // Resolved before logging starts, so its own messages are not captured;
    // the outcome is logged below instead
    let mut config = resolver.resolve().context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }

    init_logging(&config.logging)?;

    info!("Starting mreq-bot v{}", env!("CARGO_PKG_VERSION"));
    match resolver.config_path() {
        Some(path) if path.exists() => info!("Config: {}", path.display()),
        Some(path) => warn!("Config {} not found, running on defaults", path.display()),
        None => warn!("No config path available, running on defaults"),
    }
    info!("Catalogue: {}", config.api_base_url);
    info!("Default quality: {}", config.default_quality);

    let catalogue: Arc<dyn MusicCatalogue> = Arc::new(
        NeteaseClient::new(
            &config.api_base_url,
            &config.cookie,
            config.request_timeout(),
        )
        .context("Failed to build catalogue client")?,
    );

    let event_bus = EventBus::new(EVENT_BUS_CAPACITY);
    let sessions = Arc::new(SessionManager::new(config.session_ttl()));

    let sweeper = config
        .sweep_interval()
        .map(|interval| sessions.clone().spawn_sweeper(interval, event_bus.clone()));

    let dispatcher = Dispatcher::new(&config, catalogue, sessions, event_bus.clone())
        .context("Failed to initialize dispatcher")?;

    let app = mreq_bot::build_router(AppState::new(Arc::new(dispatcher), event_bus));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(handle) = sweeper {
        handle.abort();
    }

    info!("Server shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins over `logging.level`; a configured file gets a second,
/// ANSI-free copy of the output
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .with_context(|| format!("Invalid log level '{}'", logging.level))?;

    let file_layer = match &logging.file {
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

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
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
