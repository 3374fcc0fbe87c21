//! Strict global serialization strategy

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};

use crate::connection::PooledConnection;
use crate::error::{PoolError, Result};

use super::ConnectionPool;
use super::stats::PoolStats;

/// Owner-plus-count simulation of a re-entrant lock.
///
/// `release` only unlocks once the hold count returns to zero, and a
/// release by a thread that does not hold the gate is reported rather
/// than allowed to corrupt the owner state.
pub(super) struct ReentrantGate {
    state: Mutex<GateState>,
    unlocked: Condvar,
}

#[derive(Default)]
struct GateState {
    owner: Option<ThreadId>,
    count: usize,
}

impl ReentrantGate {
    pub(super) fn new() -> Self {
        Self {
            state: Mutex::new(GateState::default()),
            unlocked: Condvar::new(),
        }
    }

    /// Block until the calling thread holds the gate.
    ///
    /// Re-entrant: a thread already inside increments its hold count and
    /// returns at once.
    pub(super) fn acquire(&self) {
        let me = thread::current().id();
        let mut state = self.state.lock();
        loop {
            match state.owner {
                None => {
                    state.owner = Some(me);
                    state.count = 1;
                    return;
                }
                Some(owner) if owner == me => {
                    state.count += 1;
                    return;
                }
                Some(_) => self.unlocked.wait(&mut state),
            }
        }
    }

    /// Give up one unit of the gate.
    ///
    /// Returns `false` when the calling thread did not hold the gate, in
    /// which case nothing changes.
    pub(super) fn release(&self) -> bool {
        let me = thread::current().id();
        let mut state = self.state.lock();
        if state.owner != Some(me) {
            return false;
        }
        state.count -= 1;
        if state.count == 0 {
            state.owner = None;
            drop(state);
            self.unlocked.notify_one();
        }
        true
    }
}

/// Pool that serializes all database access behind one process-wide
/// re-entrant critical section.
///
/// Every thread still gets its own physical connection (the engine's
/// shared-cache mode permits that), but at most one thread is ever
/// inside the pool at a time: `connect` blocks until every other thread
/// has fully released. A thread may nest `connect` calls; it receives
/// the identical handle back and must match each call with a `release`
/// before other threads can proceed.
pub struct SerializedPool {
    db_file: String,
    is_uri: bool,
    gate: ReentrantGate,
    // ThreadId-keyed substitute for thread-local storage: close() must
    // be able to clear every thread's cached handle from one thread.
    thread_conns: Mutex<HashMap<ThreadId, Arc<PooledConnection>>>,
    all_conns: Mutex<Vec<Arc<PooledConnection>>>,
    closed: AtomicBool,
}

impl SerializedPool {
    /// Create a pool over `db_file`. No connection is opened until the
    /// first `connect`.
    pub fn new(db_file: impl Into<String>, is_uri: bool) -> Self {
        let db_file = db_file.into();
        tracing::debug!(db_file = %db_file, "creating serialized pool");
        Self {
            db_file,
            is_uri,
            gate: ReentrantGate::new(),
            thread_conns: Mutex::new(HashMap::new()),
            all_conns: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }
}

impl ConnectionPool for SerializedPool {
    fn connect(&self) -> Result<Arc<PooledConnection>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PoolError::Closed);
        }
        self.gate.acquire();
        if self.closed.load(Ordering::Acquire) {
            // The pool was closed while we blocked on the gate.
            self.gate.release();
            return Err(PoolError::Closed);
        }

        let me = thread::current().id();
        if let Some(conn) = self.thread_conns.lock().get(&me) {
            return Ok(Arc::clone(conn));
        }

        let conn = match PooledConnection::open(&self.db_file, self.is_uri) {
            Ok(conn) => Arc::new(conn),
            Err(e) => {
                self.gate.release();
                return Err(e);
            }
        };
        self.thread_conns.lock().insert(me, Arc::clone(&conn));
        self.all_conns.lock().push(Arc::clone(&conn));
        Ok(conn)
    }

    fn release(&self, _conn: Arc<PooledConnection>) {
        if !self.gate.release() {
            // Release with no matching connect; tolerated so that a
            // double release cannot corrupt the gate.
            tracing::debug!(db_file = %self.db_file, "release without matching connect ignored");
        }
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::info!(db_file = %self.db_file, "closing serialized pool");
        let conns: Vec<_> = self.all_conns.lock().drain(..).collect();
        for conn in &conns {
            conn.close_physical();
        }
        self.thread_conns.lock().clear();
        // Give up the closing thread's own hold, if it had one, so
        // waiters blocked on the gate can observe the closed pool.
        let _ = self.gate.release();
    }

    fn stats(&self) -> PoolStats {
        // Handles stay cached by their threads between connects, so
        // everything ever opened counts as checked out.
        let total = self.all_conns.lock().len();
        PoolStats::new(total, 0, total, 0)
    }
}
