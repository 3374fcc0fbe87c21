//! Per-thread connection strategy

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use crate::connection::PooledConnection;
use crate::error::{PoolError, Result};

use super::ConnectionPool;
use super::stats::PoolStats;

/// One dedicated physical connection per calling thread.
///
/// `connect` never blocks: each thread reuses its own cached connection,
/// and distinct threads execute fully in parallel against distinct
/// connections (valid under the engine's shared-cache mode). The
/// connection count grows with the number of distinct threads that ever
/// call `connect`; nothing is evicted before `close`.
pub struct PerThreadPool {
    db_file: String,
    is_uri: bool,
    // ThreadId-keyed substitute for thread-local storage; guarded by its
    // own lock since close() clears it from an arbitrary thread.
    thread_conns: Mutex<HashMap<ThreadId, Arc<PooledConnection>>>,
    all_conns: Mutex<Vec<Arc<PooledConnection>>>,
    closed: AtomicBool,
}

impl PerThreadPool {
    /// Create a pool over `db_file`. No connection is opened until the
    /// first `connect`.
    pub fn new(db_file: impl Into<String>, is_uri: bool) -> Self {
        let db_file = db_file.into();
        tracing::debug!(db_file = %db_file, "creating per-thread pool");
        Self {
            db_file,
            is_uri,
            thread_conns: Mutex::new(HashMap::new()),
            all_conns: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }
}

impl ConnectionPool for PerThreadPool {
    fn connect(&self) -> Result<Arc<PooledConnection>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PoolError::Closed);
        }

        let me = thread::current().id();
        if let Some(conn) = self.thread_conns.lock().get(&me) {
            return Ok(Arc::clone(conn));
        }

        // Open outside the map lock so first connects from unrelated
        // threads do not serialize on each other.
        let conn = Arc::new(PooledConnection::open(&self.db_file, self.is_uri)?);
        self.thread_conns.lock().insert(me, Arc::clone(&conn));
        self.all_conns.lock().push(Arc::clone(&conn));
        Ok(conn)
    }

    fn release(&self, _conn: Arc<PooledConnection>) {
        // Each thread keeps its connection cached for its next connect.
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::info!(db_file = %self.db_file, "closing per-thread pool");
        let conns: Vec<_> = self.all_conns.lock().drain(..).collect();
        for conn in &conns {
            conn.close_physical();
        }
        self.thread_conns.lock().clear();
    }

    fn stats(&self) -> PoolStats {
        // Handles stay cached by their threads between connects, so
        // everything ever opened counts as checked out.
        let total = self.all_conns.lock().len();
        PoolStats::new(total, 0, total, 0)
    }
}
