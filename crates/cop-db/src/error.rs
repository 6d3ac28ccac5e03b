//! Error types for the persistence layer.
//!
//! All errors are propagated via [`DbError`] which wraps the underlying
//! [`sqlx`] errors with context about which operation failed.

/// Errors that can occur in the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored value could not be mapped back to a domain type.
    #[error("decode error: {0}")]
    Decode(String),

    /// A referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The store refused the write. No backend here returns it; test
    /// doubles use it to simulate a failed commit.
    #[error("write rejected: {0}")]
    WriteRejected(String),

    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
