//! Criss-cross puzzle server.
//!
//! Each session runs as its own actor task behind a shared registry, with a
//! background monitor removing players whose heartbeats stop.

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Error;
use cc_server::{api, config::ServerConfig, logging, metrics};
use criss_cross::{
    SessionRegistry,
    db::Database,
    services::{AccountService, InMemoryAccountService, InMemoryWordRepository, WordRepository},
};
use ctrlc::set_handler;
use log::{error, info, warn};
use pico_args::Arguments;
use tokio::sync::watch;

const HELP: &str = "\
Run a multiplayer criss-cross puzzle server

USAGE:
  cc_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --words      PATH        Newline-separated word list [default: env WORDS_FILE]
  --db-url     URL         Database connection string  [default: env DATABASE_URL, in-memory scores if unset]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  METRICS_BIND             Prometheus exporter address (disabled if unset)
  DATABASE_URL             PostgreSQL connection string
  WORDS_FILE               Word list path
  HEARTBEAT_INTERVAL_SECS  Expected client heartbeat interval
  (See .env file for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let words: Option<PathBuf> = pargs.opt_value_from_str("--words")?;
    let database_url: Option<String> = pargs.opt_value_from_str("--db-url")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    set_handler(move || {
        let _ = shutdown_tx.send(true);
    })?;

    logging::init()?;

    let config = ServerConfig::from_env(bind, words, database_url)?;
    config.validate()?;
    info!("Starting criss-cross server at {}", config.bind);

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(|e| anyhow::anyhow!(e))?;
        info!("Prometheus metrics exported at http://{}/metrics", metrics_bind);
    }

    let (database, accounts): (Option<Database>, Arc<dyn AccountService>) = match &config.database
    {
        Some(db_config) => {
            info!("Connecting to database");
            let db = Database::new(db_config)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
            let store = db.account_store();
            store
                .ensure_schema()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to prepare account schema: {}", e))?;
            info!("Database connected successfully");
            let accounts: Arc<dyn AccountService> = Arc::new(store);
            (Some(db), accounts)
        }
        None => {
            warn!("DATABASE_URL not set, account scores are kept in memory");
            let accounts: Arc<dyn AccountService> = Arc::new(InMemoryAccountService::new());
            (None, accounts)
        }
    };

    let words: Arc<dyn WordRepository> = match &config.words_file {
        Some(path) => Arc::new(InMemoryWordRepository::from_file(path)?),
        None => {
            warn!("No word list configured, puzzles need words added via the API");
            Arc::new(InMemoryWordRepository::new())
        }
    };

    let registry = Arc::new(SessionRegistry::new(config.session.clone(), accounts, words));
    let monitor = registry.spawn_liveness_monitor();

    let mut state = api::AppState::new(registry.clone());
    if let Some(db) = database.clone() {
        state = state.with_database(db);
    }
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_rx))
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");
    monitor.stop();
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Resolve once the Ctrl+C handler fires
async fn shutdown_signal(mut shutdown: watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        error!("Shutdown signal handler dropped");
    }
}
