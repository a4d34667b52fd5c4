//! Error types for the data layer.
//!
//! Record store failures are reported via [`DbError`]; they are fatal to the
//! request that caused them. Mirror store failures are reported via
//! [`MirrorError`]; callers log them and move on, because the relational
//! write they follow has already committed.

/// Errors that can occur in the record store.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A uniqueness, foreign-key or check constraint rejected the write.
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// Another student already uses this email address.
    #[error("email already registered: {0}")]
    DuplicateEmail(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Classify a failed write, separating constraint violations from
    /// connectivity and query errors.
    pub(crate) fn from_write(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation()
                || db_err.is_foreign_key_violation()
                || db_err.is_check_violation()
            {
                return Self::Integrity(db_err.message().to_owned());
            }
        }
        Self::Postgres(err)
    }
}

/// Errors that can occur when talking to the mirror store.
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    /// The mirror store could not be reached or rejected the operation.
    #[error("mirror store unavailable: {0}")]
    Unavailable(String),

    /// A document could not be encoded as JSON.
    #[error("mirror serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored document could not be decoded.
    #[error("malformed mirror document at {key}: {reason}")]
    Malformed {
        /// The storage key holding the document.
        key: String,
        /// Why decoding failed.
        reason: String,
    },
}

impl From<fred::error::Error> for MirrorError {
    fn from(err: fred::error::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}
