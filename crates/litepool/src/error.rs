//! Error types for litepool

use thiserror::Error;

/// Core error type for pool operations
#[derive(Error, Debug)]
pub enum PoolError {
    /// The native SQLite layer rejected a statement or transaction
    /// operation. Always propagated to the caller unmodified; this layer
    /// never retries.
    #[error("Sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The pool has already been closed; connections can no longer be
    /// obtained from it.
    #[error("Pool is closed")]
    Closed,
}

/// Result type alias for pool operations
pub type Result<T> = std::result::Result<T, PoolError>;
