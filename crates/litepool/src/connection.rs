//! Pooled SQLite connection wrapper

use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{Connection as RusqliteConnection, OpenFlags, Params, Row};

use crate::error::{PoolError, Result};

/// How long a connection waits on the engine's file lock before a
/// statement fails with `SQLITE_BUSY`.
const BUSY_TIMEOUT: Duration = Duration::from_secs(1000);

/// Page cache size, in pages.
const CACHE_SIZE_PAGES: i64 = 2_000_000;

/// Memory-map window, 2 GiB.
const MMAP_SIZE_BYTES: i64 = 2048 * 1024 * 1024;

/// One physical SQLite connection, owned by a pool for its entire
/// lifetime.
///
/// A handle is obtained through a pool's `connect()` and handed back
/// through `release()`, which keeps the native connection open for
/// reuse. The native connection is only ever torn down by the owning
/// pool's `close()`. The pool discipline guarantees no two threads use
/// one handle at the same instant; the interior mutex makes the handle
/// shareable for teardown bookkeeping regardless.
///
/// Statements autocommit unless an explicit `BEGIN` is executed;
/// [`commit`](Self::commit) and [`rollback`](Self::rollback) delegate to
/// the native transaction boundary and are silent no-ops outside an open
/// transaction.
pub struct PooledConnection {
    db_file: String,
    conn: Mutex<Option<RusqliteConnection>>,
}

impl PooledConnection {
    /// Open a new physical connection against `db_file` and apply the
    /// engine tuning the storage layer expects, in a fixed order.
    ///
    /// The pragma set trades durability for throughput: with the
    /// rollback journal and synchronous writes both off, a crash
    /// mid-write can lose or corrupt uncommitted state. The pool does
    /// not compensate for this.
    pub(crate) fn open(db_file: &str, is_uri: bool) -> Result<Self> {
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if is_uri {
            flags |= OpenFlags::SQLITE_OPEN_URI;
        }

        let conn = RusqliteConnection::open_with_flags(db_file, flags)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        conn.pragma_update(None, "cache_size", CACHE_SIZE_PAGES)?;
        conn.pragma_update(None, "temp_store", "MEMORY")?;
        conn.pragma_update(None, "journal_mode", "OFF")?;
        conn.pragma_update(None, "mmap_size", MMAP_SIZE_BYTES)?;
        conn.pragma_update(None, "synchronous", "OFF")?;
        conn.execute_batch("PRAGMA optimize;")?;
        // Refresh planner statistics for the store's two hottest tables.
        // ANALYZE of a name with no matching table or index is a SQLite
        // no-op, so a fresh database file passes through untouched.
        conn.execute_batch("ANALYZE embedding_metadata; ANALYZE embeddings;")?;

        tracing::debug!(db_file = %db_file, "opened sqlite connection");
        Ok(Self {
            db_file: db_file.to_string(),
            conn: Mutex::new(Some(conn)),
        })
    }

    fn live<'a>(conn: &'a Option<RusqliteConnection>) -> Result<&'a RusqliteConnection> {
        conn.as_ref()
            .ok_or_else(|| PoolError::Connection("Connection has been closed".into()))
    }

    /// Execute a single statement, returning the number of rows changed.
    ///
    /// Parameters are forwarded verbatim; any engine rejection surfaces
    /// as [`PoolError::Sqlite`].
    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    pub fn execute<P: Params>(&self, sql: &str, params: P) -> Result<usize> {
        let guard = self.conn.lock();
        let conn = Self::live(&guard)?;
        Ok(conn.execute(sql, params)?)
    }

    /// Run a query, mapping every result row through `row_fn`.
    #[tracing::instrument(skip(self, sql, params, row_fn), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    pub fn query<T, P, F>(&self, sql: &str, params: P, row_fn: F) -> Result<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let guard = self.conn.lock();
        let conn = Self::live(&guard)?;
        let mut stmt = conn.prepare(sql)?;
        let mapped = stmt.query_map(params, row_fn)?;
        let mut rows = Vec::new();
        for row in mapped {
            rows.push(row?);
        }
        Ok(rows)
    }

    /// Run a query expected to yield at least one row and map the first
    /// one through `row_fn`.
    pub fn query_row<T, P, F>(&self, sql: &str, params: P, row_fn: F) -> Result<T>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        let guard = self.conn.lock();
        let conn = Self::live(&guard)?;
        Ok(conn.query_row(sql, params, row_fn)?)
    }

    /// Run `f` against the raw native connection.
    ///
    /// This is the escape hatch for prepared statements, batches, and
    /// anything else the narrower helpers do not cover; the statements
    /// `f` prepares are bound to this handle's connection.
    pub fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&RusqliteConnection) -> rusqlite::Result<T>,
    {
        let guard = self.conn.lock();
        let conn = Self::live(&guard)?;
        Ok(f(conn)?)
    }

    /// Commit the open transaction.
    ///
    /// A no-op when no explicit transaction is active, matching the
    /// engine's autocommit behavior. Engine failures propagate; nothing
    /// is retried.
    pub fn commit(&self) -> Result<()> {
        let guard = self.conn.lock();
        let conn = Self::live(&guard)?;
        if !conn.is_autocommit() {
            conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    /// Roll back the open transaction. A no-op when no explicit
    /// transaction is active.
    pub fn rollback(&self) -> Result<()> {
        let guard = self.conn.lock();
        let conn = Self::live(&guard)?;
        if !conn.is_autocommit() {
            conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    /// The file path or URI this connection was opened against.
    pub fn db_file(&self) -> &str {
        &self.db_file
    }

    /// Whether the native connection has been physically closed.
    pub fn is_closed(&self) -> bool {
        self.conn.lock().is_none()
    }

    /// Physically close the native connection.
    ///
    /// Only the owning pool's `close()` calls this; an ordinary release
    /// keeps the connection open. Idempotent, and never raises: a close
    /// failure is logged and the connection dropped regardless.
    pub(crate) fn close_physical(&self) {
        if let Some(conn) = self.conn.lock().take() {
            match conn.close() {
                Ok(()) => tracing::debug!(db_file = %self.db_file, "closed sqlite connection"),
                Err((_, e)) => {
                    tracing::warn!(db_file = %self.db_file, error = %e, "error closing sqlite connection");
                }
            }
        }
    }
}
