//! Error types for the Registrar binaries.

use registrar_db::{DbError, MirrorError, ReconcileError};

use crate::config::ConfigError;

/// Top-level error for process startup and shutdown.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The record store could not be opened or migrated.
    #[error("record store error: {source}")]
    Records {
        /// The underlying database error.
        #[from]
        source: DbError,
    },

    /// The mirror store could not be opened.
    #[error("mirror store error: {source}")]
    Mirror {
        /// The underlying mirror error.
        #[from]
        source: MirrorError,
    },

    /// The HTTP server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: registrar_api::ServerError,
    },

    /// A reconciliation run left the mirror incomplete.
    #[error("{source}")]
    Reconcile {
        /// The run summary.
        #[from]
        source: ReconcileError,
    },
}
