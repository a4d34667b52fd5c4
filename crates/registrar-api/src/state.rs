//! Shared application state for the service facade.

use registrar_db::{PostgresPool, SyncEngine};

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`](std::sync::Arc) and injected via Axum's `State`
/// extractor. Both handles are opened at startup and closed at shutdown by
/// the binary that owns them.
#[derive(Clone)]
pub struct AppState {
    /// The record store (system of record).
    pub records: PostgresPool,
    /// The sync engine projecting committed rows into the mirror.
    pub sync: SyncEngine,
}

impl AppState {
    /// Create application state from the two store handles.
    pub const fn new(records: PostgresPool, sync: SyncEngine) -> Self {
        Self { records, sync }
    }
}
