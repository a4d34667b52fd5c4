//! Opening the record store and mirror store from configuration.
//!
//! Both binaries open the same two handles in the same order: the record
//! store first (it is authoritative, and migrations must run before any
//! request), then the mirror.

use std::sync::Arc;

use registrar_db::{
    DragonflyMirror, MemoryMirror, MirrorStore, PostgresConfig, PostgresPool, SyncEngine,
};
use tracing::info;

use crate::config::{InfrastructureConfig, MirrorBackend, RegistrarConfig};
use crate::error::StartupError;

/// Connect the record store pool and apply migrations when configured.
///
/// # Errors
///
/// Returns [`StartupError::Records`] if the connection or a migration fails.
pub async fn open_records(config: &InfrastructureConfig) -> Result<PostgresPool, StartupError> {
    let pg_config =
        PostgresConfig::new(&config.postgres_url).with_max_connections(config.max_connections);
    let pool = PostgresPool::connect(&pg_config).await?;

    if config.run_migrations {
        pool.run_migrations().await?;
    } else {
        info!("Skipping migrations");
    }
    Ok(pool)
}

/// Open the configured mirror store.
///
/// # Errors
///
/// Returns [`StartupError::Mirror`] if the Dragonfly connection fails.
pub async fn open_mirror(config: &RegistrarConfig) -> Result<Arc<dyn MirrorStore>, StartupError> {
    match config.mirror.backend {
        MirrorBackend::Dragonfly => {
            let mirror = DragonflyMirror::connect(
                &config.infrastructure.dragonfly_url,
                &config.mirror.key_prefix,
            )
            .await?;
            Ok(Arc::new(mirror))
        }
        MirrorBackend::Memory => {
            tracing::warn!("Using in-memory mirror; documents are lost on exit");
            Ok(Arc::new(MemoryMirror::new()))
        }
    }
}

/// Open both stores and build the sync engine over the mirror.
///
/// # Errors
///
/// Returns the first [`StartupError`] encountered. If the mirror fails to
/// open, the already-open record pool is closed before returning.
pub async fn open_stores(config: &RegistrarConfig) -> Result<(PostgresPool, SyncEngine), StartupError> {
    let records = open_records(&config.infrastructure).await?;
    match open_mirror(config).await {
        Ok(mirror) => Ok((records, SyncEngine::new(mirror))),
        Err(e) => {
            records.close().await;
            Err(e)
        }
    }
}

/// Close both stores. Called once at process exit.
pub async fn close_stores(records: &PostgresPool, sync: &SyncEngine) {
    sync.shutdown().await;
    records.close().await;
    info!("Stores closed");
}
