//! Error types for the relay binary.

use crate::config::ConfigError;

/// Top-level startup and runtime error.
///
/// Each variant wraps a subsystem error so `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The persistence backend could not be opened or migrated.
    #[error("storage error: {source}")]
    Storage {
        /// The underlying database error.
        #[from]
        source: cop_db::DbError,
    },

    /// The HTTP server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: cop_gateway::ServerError,
    },
}
