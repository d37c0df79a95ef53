//! creatorhub-server - Creator management platform backend
//!
//! Serves the REST API and privileged functions, and runs the background
//! email retry scheduler until Ctrl-C.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use creatorhub_common::config::{CliOverrides, ServerConfig, ROOT_FOLDER_ENV};
use creatorhub_common::db::init_database;
use creatorhub_server::email::mailer_from_config;
use creatorhub_server::scheduler::spawn_email_retry;
use creatorhub_server::storage::Storage;
use creatorhub_server::{build_router, AppState};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "creatorhub-server")]
#[command(about = "Creator management platform backend")]
#[command(version)]
struct Args {
    /// Root folder holding the database and storage buckets
    #[arg(short, long, env = ROOT_FOLDER_ENV)]
    root_folder: Option<String>,

    /// Path to config.toml
    #[arg(short, long, env = "CREATORHUB_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address (host:port)
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ServerConfig::resolve(&CliOverrides {
        root_folder: args.root_folder,
        config_path: args.config,
        bind_address: args.bind,
    })
    .context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "Starting Creator Hub server (creatorhub-server) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let root = config.root();
    root.ensure_directory_exists()?;
    info!("Root folder: {}", root.path().display());

    let db_path = root.database_path();
    let pool = match init_database(&db_path).await {
        Ok(pool) => {
            info!("✓ Database ready: {}", db_path.display());
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    let mailer = mailer_from_config(&config.email);
    let storage = Storage::new(root.storage_path());
    let bind_address = config.bind_address.clone();
    if config.allow_test_data {
        info!("Test data creation is enabled");
    }

    let state = AppState::new(pool, config, mailer, storage);
    let cancel = CancellationToken::new();
    let scheduler = spawn_email_retry(state.clone(), cancel.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!("creatorhub-server listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
            }
            info!("Shutdown requested");
            shutdown.cancel();
        })
        .await?;

    cancel.cancel();
    if let Some(handle) = scheduler {
        let _ = handle.await;
    }
    info!("creatorhub-server stopped");
    Ok(())
}
