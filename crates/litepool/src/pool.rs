//! Connection pool strategies
//!
//! Three interchangeable policies reconcile concurrent callers with
//! SQLite's one-thread-per-connection constraint. All of them hand out
//! [`PooledConnection`] handles through the same [`ConnectionPool`]
//! contract; which policy backs a pool is decided once, at construction
//! time, by the caller.
//!
//! # Example
//!
//! ```ignore
//! use litepool::pool::{BoundedPool, ConnectionPool};
//!
//! let pool = BoundedPool::new("data.sqlite3", false)?;
//! let conn = pool.connect()?;
//! conn.execute("INSERT INTO items VALUES (?1)", [42])?;
//! conn.commit()?;
//! pool.release(conn);
//! // ... at shutdown:
//! pool.close();
//! ```

mod bounded;
mod config;
mod per_thread;
mod serialized;
mod stats;


use std::sync::Arc;

use crate::connection::PooledConnection;
use crate::error::Result;

pub use bounded::{BoundedPool, DEFAULT_CAPACITY};
pub use config::{PoolConfig, PoolStrategy};
pub use per_thread::PerThreadPool;
pub use serialized::SerializedPool;
pub use stats::PoolStats;

/// Contract shared by every pool strategy.
///
/// Callers depend only on this trait, never on a concrete strategy.
pub trait ConnectionPool: Send + Sync {
    /// Obtain a connection bound to the calling thread.
    ///
    /// May block indefinitely: on the serialized pool's process-wide
    /// critical section, or on the bounded pool's queue while every
    /// connection is checked out. There is no timeout and no
    /// cancellation; a blocked call unblocks only through a matching
    /// `release` elsewhere, or fails with `PoolError::Closed` once the
    /// pool has been closed.
    fn connect(&self) -> Result<Arc<PooledConnection>>;

    /// Logically return a connection obtained from `connect`.
    ///
    /// Never closes the native connection and never raises. A release
    /// with no matching `connect` is tolerated by the serialized pool,
    /// a no-op for the per-thread pool, and a handle the bounded pool
    /// does not recognize as its own is silently dropped.
    fn release(&self, conn: Arc<PooledConnection>);

    /// Physically close every connection this pool ever created and
    /// refuse further `connect` calls.
    ///
    /// Safe to call from any thread; a second call is a no-op.
    /// Connections still checked out by other threads are closed out
    /// from under them - quiescing callers before shutdown is the
    /// caller's responsibility.
    fn close(&self);

    /// Snapshot of the pool's current occupancy.
    fn stats(&self) -> PoolStats;
}

impl std::fmt::Debug for dyn ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("stats", &self.stats())
            .finish()
    }
}
