//! Litepool - connection pooling for embedded SQLite
//!
//! SQLite's native driver does not allow a single connection to be used
//! from multiple threads without synchronization. This crate reconciles
//! concurrent callers with that constraint through three interchangeable
//! pooling strategies, selected once at construction time:
//!
//! - [`SerializedPool`] - one connection per thread behind a single
//!   process-wide re-entrant critical section; at most one thread is
//!   ever inside the pool at a time.
//! - [`PerThreadPool`] - one connection per thread with no cross-thread
//!   synchronization; threads run fully in parallel against distinct
//!   connections.
//! - [`BoundedPool`] - a fixed-size connection set shared by all
//!   threads; `connect` blocks while every connection is checked out.
//!
//! Callers depend only on the [`ConnectionPool`] trait: obtain a handle
//! with `connect()`, do the work, hand it back with `release()`, and
//! tear everything down once with `close()` at shutdown.

mod connection;
mod error;
pub mod pool;

pub use connection::PooledConnection;
pub use error::{PoolError, Result};
pub use pool::{
    BoundedPool, ConnectionPool, DEFAULT_CAPACITY, PerThreadPool, PoolConfig, PoolStats,
    PoolStrategy, SerializedPool,
};
