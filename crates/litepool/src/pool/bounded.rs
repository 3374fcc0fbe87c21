//! Bounded shared connection strategy

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::{Condvar, Mutex};

use crate::connection::PooledConnection;
use crate::error::{PoolError, Result};

use super::ConnectionPool;
use super::stats::PoolStats;

/// Number of connections a bounded pool opens when no capacity is given.
pub const DEFAULT_CAPACITY: usize = 10;

/// A fixed-size set of connections shared across arbitrary threads.
///
/// Construction opens exactly `capacity` connections up front; the
/// constructor does not return until the pool is fully filled, so a
/// caller never observes a partially initialized pool. `connect` hands
/// out an available connection or blocks until another thread releases
/// one. At most `capacity` connections are checked out at any instant.
/// Waiters are woken in no guaranteed order, and capacity is fixed for
/// the pool's lifetime.
pub struct BoundedPool {
    db_file: String,
    is_uri: bool,
    capacity: usize,
    available: Mutex<VecDeque<Arc<PooledConnection>>>,
    released: Condvar,
    all_conns: Mutex<Vec<Arc<PooledConnection>>>,
    waiting: AtomicUsize,
    closed: AtomicBool,
}

impl BoundedPool {
    /// Create a pool with [`DEFAULT_CAPACITY`] connections.
    pub fn new(db_file: impl Into<String>, is_uri: bool) -> Result<Self> {
        Self::with_capacity(db_file, is_uri, DEFAULT_CAPACITY)
    }

    /// Create a pool pre-filled with exactly `capacity` connections.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn with_capacity(
        db_file: impl Into<String>,
        is_uri: bool,
        capacity: usize,
    ) -> Result<Self> {
        assert!(capacity > 0, "capacity must be greater than 0");
        let db_file = db_file.into();
        tracing::debug!(db_file = %db_file, capacity, "creating bounded pool");

        let pool = Self {
            db_file,
            is_uri,
            capacity,
            available: Mutex::new(VecDeque::with_capacity(capacity)),
            released: Condvar::new(),
            all_conns: Mutex::new(Vec::with_capacity(capacity)),
            waiting: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        };
        for _ in 0..capacity {
            let conn = pool.open_connection()?;
            pool.available.lock().push_back(conn);
        }
        Ok(pool)
    }

    /// Open a connection and record it in the teardown registry.
    fn open_connection(&self) -> Result<Arc<PooledConnection>> {
        let conn = Arc::new(PooledConnection::open(&self.db_file, self.is_uri)?);
        self.all_conns.lock().push(Arc::clone(&conn));
        Ok(conn)
    }

    fn is_registered(&self, conn: &Arc<PooledConnection>) -> bool {
        self.all_conns.lock().iter().any(|c| Arc::ptr_eq(c, conn))
    }

    /// The capacity this pool was created with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl ConnectionPool for BoundedPool {
    fn connect(&self) -> Result<Arc<PooledConnection>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PoolError::Closed);
        }

        let popped = {
            let mut available = self.available.lock();
            self.waiting.fetch_add(1, Ordering::SeqCst);
            while available.is_empty() && !self.closed.load(Ordering::Acquire) {
                self.released.wait(&mut available);
            }
            self.waiting.fetch_sub(1, Ordering::SeqCst);
            if self.closed.load(Ordering::Acquire) {
                return Err(PoolError::Closed);
            }
            available.pop_front()
        };

        match popped {
            Some(conn) => Ok(conn),
            None => {
                // Safety valve: the queue yielded nothing even though we
                // were woken. Open on demand instead of failing.
                tracing::warn!(
                    db_file = %self.db_file,
                    "available queue empty after wait; opening on-demand connection"
                );
                self.open_connection()
            }
        }
    }

    fn release(&self, conn: Arc<PooledConnection>) {
        if !self.is_registered(&conn) {
            // Not one of ours (or the pool already closed and cleared
            // its registry); dropping it keeps the pool at fixed size.
            tracing::debug!(
                db_file = %conn.db_file(),
                "dropping unrecognized connection on release"
            );
            return;
        }
        self.available.lock().push_back(conn);
        self.released.notify_one();
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::info!(db_file = %self.db_file, "closing bounded pool");

        // Drain whatever sits in the queue first, then sweep the
        // registry, which also covers connections never returned. A
        // connection still in use by another thread is closed out from
        // under it; quiescing first is the caller's job.
        let drained: Vec<_> = self.available.lock().drain(..).collect();
        for conn in &drained {
            conn.close_physical();
        }
        let conns: Vec<_> = self.all_conns.lock().drain(..).collect();
        for conn in &conns {
            conn.close_physical();
        }
        // Wake blocked waiters so they observe the closed pool.
        self.released.notify_all();
    }

    fn stats(&self) -> PoolStats {
        let total = self.all_conns.lock().len();
        let idle = self.available.lock().len();
        let waiting = self.waiting.load(Ordering::SeqCst);
        PoolStats::new(total, idle, total.saturating_sub(idle), waiting)
    }
}
