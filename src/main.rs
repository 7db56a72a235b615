//! Clicker Game Server
//!
//! Bootstrap: logging, configuration, storage, catalog seeding, then the
//! HTTP server until Ctrl-C.

use anyhow::Context;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use clicker::{
    storage::{load_catalog, seed_catalog_if_empty},
    AppConfig, GameServer, GameService, MemoryStore, NativeStore, Storage, VERSION,
};

#[cfg(feature = "debug-tracing")]
const DEFAULT_LOG_LEVEL: &str = "debug";
#[cfg(not(feature = "debug-tracing"))]
const DEFAULT_LOG_LEVEL: &str = "info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to set tracing subscriber")?;

    info!("Clicker Server v{}", VERSION);

    let config = AppConfig::from_env().context("invalid configuration")?;

    let store: Arc<dyn Storage> = match &config.storage.db_path {
        Some(path) => {
            info!("Opening database {}", path.display());
            Arc::new(NativeStore::open(path).context("failed to open database")?)
        }
        None => {
            warn!("No database path set, state will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    let seeded = seed_catalog_if_empty(store.as_ref(), &config.storage.catalog_path)
        .with_context(|| format!("failed to seed catalog from {}", config.storage.catalog_path.display()))?;
    if seeded > 0 {
        info!("Seeded {} catalog items", seeded);
    }

    let catalog = load_catalog(store.as_ref()).context("failed to load catalog")?;
    if catalog.is_empty() {
        warn!("Item catalog is empty");
    }

    let service = Arc::new(GameService::new(store, Arc::new(catalog), config.game.clone()));
    let server = Arc::new(GameServer::new(config.server.clone(), service));

    let signal_server = server.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, shutting down");
                signal_server.shutdown();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    server.run().await.context("server failed")?;

    info!("Server stopped");
    Ok(())
}
