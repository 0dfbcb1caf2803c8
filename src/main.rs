//! rocket-control - realtime multi-user rocket mission simulation service.
//!
//! # Usage
//!
//! ```bash
//! rocket-control --config rocket_control.toml
//! rocket-control --in-memory --addr 127.0.0.1:9000
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use rocket_control::config::{self, RuntimeConfig};
use rocket_control::mission::MissionRegistry;
use rocket_control::store::{InMemoryStore, SledStore, Store};
use rocket_control::api::{self, AppState};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "rocket-control")]
#[command(about = "Realtime multi-user rocket mission simulation service")]
#[command(version)]
struct CliArgs {
    /// Path to a TOML config file. Falls back to `rocket_control.toml` in
    /// the working directory, then built-in defaults.
    #[arg(long)]
    config: Option<String>,

    /// Use the in-memory store instead of the durable sled backend.
    /// Data does not survive a restart.
    #[arg(long)]
    in_memory: bool,

    /// Override the server bind address (default comes from config).
    #[arg(long)]
    addr: Option<String>,
}

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn load_config(args: &CliArgs) -> RuntimeConfig {
    if let Some(path) = &args.config {
        match RuntimeConfig::load_from(path) {
            Ok(config) => return config,
            Err(err) => {
                error!(%err, path, "failed to load config file, falling back to defaults");
            }
        }
    } else if let Ok(config) = RuntimeConfig::load_from("rocket_control.toml") {
        return config;
    }
    RuntimeConfig::default()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let runtime_config = load_config(&args);
    let bind_addr = args.addr.clone().unwrap_or_else(|| runtime_config.bind_addr());
    config::init(runtime_config.clone());

    info!("starting rocket-control");

    let store: Arc<dyn Store> = if args.in_memory {
        info!("using in-memory store");
        Arc::new(InMemoryStore::new())
    } else {
        info!(db = %runtime_config.database.name, "opening sled store");
        Arc::new(SledStore::open(&runtime_config.database.name).context("failed to open sled store")?)
    };

    let registry = Arc::new(MissionRegistry::new(store.clone()));
    let app_state = AppState { store, registry };
    let app = api::create_app(app_state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind to {bind_addr}"))?;
    info!(addr = %bind_addr, "listening");

    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal");
        shutdown_token.cancel();
    });

    let serve_cancel = cancel_token.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        serve_cancel.cancelled().await;
    });

    match tokio::time::timeout(SHUTDOWN_GRACE + Duration::from_secs(5), server).await {
        Ok(Ok(())) => info!("server shut down cleanly"),
        Ok(Err(err)) => error!(%err, "server error"),
        Err(_) => error!("shutdown grace period exceeded, forcing exit"),
    }

    info!("rocket-control shutdown complete");
    Ok(())
}
