//! COP real-time relay binary.
//!
//! Wires the broadcast hub, the persistence backend, the command
//! processors, and the HTTP gateway together and serves until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `cop-relay.yaml` (or `COP_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Open the storage backend (in-memory or `PostgreSQL`)
//! 4. Create the broadcast hub and application state
//! 5. Serve the gateway

mod config;
mod error;

use std::sync::Arc;

use cop_db::{ChatRepository, InMemoryStore, PostgresConfig, PostgresPool, UnitRepository};
use cop_gateway::{AppState, PermissiveTokenVerifier, TokenVerifier};
use cop_hub::BroadcastHub;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{AuthMode, LogFormat, LoggingConfig, RelayConfig, StorageBackend};
use crate::error::RelayError;

/// Storage handles for the command processors, plus the pool to close on
/// shutdown when `PostgreSQL` is in use.
struct Storage {
    chat: Arc<dyn ChatRepository>,
    units: Arc<dyn UnitRepository>,
    pool: Option<PostgresPool>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration.
    let path = config::config_path();
    let config = RelayConfig::load(&path).map_err(RelayError::from)?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!(
        config = %path.display(),
        host = %config.server.host,
        port = config.server.port,
        backend = ?config.storage.backend,
        "cop-relay starting"
    );

    // 3. Open storage.
    let storage = open_storage(&config).await?;

    // 4. Hub and state.
    let hub = Arc::new(BroadcastHub::new());
    let verifier: Arc<dyn TokenVerifier> = match config.auth.mode {
        AuthMode::Permissive => {
            warn!("Chat tokens are not verified (auth.mode = permissive)");
            Arc::new(PermissiveTokenVerifier)
        }
    };
    let state = AppState::new(hub, storage.chat, storage.units)
        .with_verifier(verifier)
        .with_streams(config.streams.settings());

    // 5. Serve.
    let served = cop_gateway::start_server(&config.server_config(), Arc::new(state)).await;
    if let Some(pool) = storage.pool {
        pool.close().await;
    }
    served.map_err(RelayError::from)?;

    info!("cop-relay stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    match logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}

async fn open_storage(config: &RelayConfig) -> Result<Storage, RelayError> {
    match config.storage.backend {
        StorageBackend::Memory => {
            info!("Using in-memory storage; nothing survives a restart");
            let store = Arc::new(InMemoryStore::new());
            Ok(Storage {
                chat: store.clone(),
                units: store,
                pool: None,
            })
        }
        StorageBackend::Postgres => {
            let pg_config = PostgresConfig::new(&config.storage.postgres_url)
                .with_max_connections(config.storage.max_connections);
            let pool = PostgresPool::connect(&pg_config).await?;
            if config.storage.run_migrations {
                pool.migrate().await?;
                info!("Migrations applied");
            }
            Ok(Storage {
                chat: Arc::new(pool.chat_store()),
                units: Arc::new(pool.unit_store()),
                pool: Some(pool),
            })
        }
    }
}
