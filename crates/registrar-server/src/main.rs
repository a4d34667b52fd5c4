//! Registrar HTTP service binary.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (CLI argument, `REGISTRAR_CONFIG`, or
//!    `registrar-config.yaml`)
//! 2. Initialize structured logging (tracing)
//! 3. Connect the record store and apply migrations
//! 4. Open the mirror store and build the sync engine
//! 5. Serve the HTTP API until `Ctrl-C`
//! 6. Close the mirror client and the record store pool

use std::sync::Arc;

use registrar_api::{AppState, build_router, start_server};
use registrar_server::{RegistrarConfig, logging, startup};
use tracing::info;

/// Application entry point for the HTTP service.
///
/// # Errors
///
/// Returns an error if configuration, either store, or the server fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = RegistrarConfig::load(std::env::args().nth(1))?;

    // 2. Initialize structured logging.
    logging::init(&config.logging);
    info!(
        host = config.server.host,
        port = config.server.port,
        mirror_backend = ?config.mirror.backend,
        "registrar-server starting"
    );

    // 3-4. Open both stores.
    let (records, sync) = startup::open_stores(&config).await?;

    // 5. Serve.
    let state = Arc::new(AppState::new(records.clone(), sync.clone()));
    let router = build_router(state, &config.cors.to_settings());
    let served = start_server(&config.server, router).await;

    // 6. Release the stores whether or not serving succeeded.
    startup::close_stores(&records, &sync).await;
    served?;

    info!("registrar-server stopped");
    Ok(())
}
