use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use golden_boot::clock::{Clock, SystemClock};
use golden_boot::config::load_config;
use golden_boot::routes::{self, AppServices};
use golden_boot::services::draft::DraftService;
use golden_boot::services::poller::Poller;
use golden_boot::services::presence::PresenceTracker;
use golden_boot::services::sweeper::Sweeper;
use golden_boot::services::transfer::TransferService;
use golden_boot::store::SqliteStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("golden_boot=info,warn")),
        )
        .init();

    let config = load_config().context("Could not load configuration")?;
    if config.auth.uses_dev_secret() {
        warn!("Using the built-in development JWT secret; set GOLDEN_BOOT_JWT_SECRET in production.");
    }

    if let Some(parent) = config.database.file_path().and_then(|p| p.parent().map(|d| d.to_path_buf())) {
        std::fs::create_dir_all(&parent)
            .with_context(|| format!("Could not create database directory {}", parent.display()))?;
    }
    let store = SqliteStore::connect(&config.database.url, config.database.max_connections)
        .await
        .context("Could not connect to SQLite")?;
    info!("Connected to sqlite database.");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let drafts = DraftService::new(store.clone(), clock.clone(), config.turns.clone());
    let transfers = TransferService::new(store.clone(), clock.clone(), config.turns.clone());
    let presence = PresenceTracker::new(store.clone(), config.turns.clone());

    let sweeper = Sweeper::new(store.clone(), drafts.clone(), transfers.clone());
    let poller = Poller::spawn(config.poll.interval(), move || {
        let sweeper = sweeper.clone();
        async move {
            if let Err(e) = sweeper.sweep().await {
                error!("Session sweep failed: {}", e);
            }
        }
    });

    let app = routes::router(AppServices {
        store,
        drafts,
        transfers,
        presence,
        clock,
        auth: Arc::new(config.auth.clone()),
    });

    let listener = TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Could not bind {}", config.server.bind_addr))?;
    info!("Started server on {}.", config.server.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Could not listen for shutdown signal: {}", e);
            }
            info!("Shutting down.");
        })
        .await
        .context("Server error")?;

    poller.cancel().await;
    Ok(())
}
