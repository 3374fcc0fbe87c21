//! Pool configuration types

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{PoolError, Result};

use super::{BoundedPool, ConnectionPool, DEFAULT_CAPACITY, PerThreadPool, SerializedPool};

/// Which strategy backs a pool built from a [`PoolConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolStrategy {
    /// One connection per thread behind a single process-wide re-entrant
    /// critical section. The most conservative choice and the default.
    #[default]
    Serialized,
    /// One connection per thread, no cross-thread synchronization,
    /// unbounded connection count.
    PerThread,
    /// A fixed-size connection set shared across threads; `connect`
    /// blocks while all connections are checked out.
    Bounded,
}

/// Configuration for building a connection pool
///
/// Selects the target database file, whether that string is a URI, the
/// pooling strategy, and (for the bounded strategy) the capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Path to the database file, or a URI when `is_uri` is set
    db_file: String,
    /// Treat `db_file` as a sqlite URI (e.g. `file:data.db?cache=shared`)
    #[serde(default)]
    is_uri: bool,
    /// Strategy backing pools built from this configuration
    #[serde(default)]
    strategy: PoolStrategy,
    /// Connection count for the bounded strategy; ignored by the others
    #[serde(default)]
    capacity: Option<usize>,
}

impl PoolConfig {
    /// Create a configuration for the given database file with the
    /// default strategy.
    pub fn new(db_file: impl Into<String>) -> Self {
        Self {
            db_file: db_file.into(),
            is_uri: false,
            strategy: PoolStrategy::default(),
            capacity: None,
        }
    }

    /// Treat the database address as a sqlite URI.
    pub fn with_uri(mut self, is_uri: bool) -> Self {
        self.is_uri = is_uri;
        self
    }

    /// Select the strategy backing built pools.
    pub fn with_strategy(mut self, strategy: PoolStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the bounded strategy's connection count.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Get the database file path or URI.
    pub fn db_file(&self) -> &str {
        &self.db_file
    }

    /// Whether the database address is a sqlite URI.
    pub fn is_uri(&self) -> bool {
        self.is_uri
    }

    /// Get the configured strategy.
    pub fn strategy(&self) -> PoolStrategy {
        self.strategy
    }

    /// Get the bounded strategy's connection count.
    pub fn capacity(&self) -> usize {
        self.capacity.unwrap_or(DEFAULT_CAPACITY)
    }

    /// Build a pool backed by the configured strategy.
    ///
    /// Fails with `PoolError::Configuration` when the capacity is 0, and
    /// with the underlying engine error when the bounded strategy cannot
    /// open its initial connections.
    pub fn build(&self) -> Result<Arc<dyn ConnectionPool>> {
        tracing::debug!(db_file = %self.db_file, strategy = ?self.strategy, "building pool");
        match self.strategy {
            PoolStrategy::Serialized => {
                Ok(Arc::new(SerializedPool::new(&self.db_file, self.is_uri)))
            }
            PoolStrategy::PerThread => {
                Ok(Arc::new(PerThreadPool::new(&self.db_file, self.is_uri)))
            }
            PoolStrategy::Bounded => {
                let capacity = self.capacity();
                if capacity == 0 {
                    return Err(PoolError::Configuration(
                        "capacity must be greater than 0".into(),
                    ));
                }
                Ok(Arc::new(BoundedPool::with_capacity(
                    &self.db_file,
                    self.is_uri,
                    capacity,
                )?))
            }
        }
    }
}
