//! Durability round-trip tests
//!
//! Committed state must survive pool teardown and be visible to later
//! pool instances over the same file, regardless of which strategy each
//! instance uses.

use litepool::{BoundedPool, ConnectionPool, PerThreadPool, SerializedPool};
use rstest::rstest;

use crate::fixtures::{TestDb, test_db};

#[rstest]
fn test_round_trip_across_pool_instances(test_db: TestDb) -> anyhow::Result<()> {
    // Create the table through a serialized pool.
    let pool = SerializedPool::new(&test_db.path, false);
    let conn = pool.connect()?;
    conn.execute("CREATE TABLE t (x INTEGER)", [])?;
    conn.commit()?;
    pool.release(conn);
    pool.close();

    // Insert through a bounded pool over the same file.
    let pool = BoundedPool::with_capacity(&test_db.path, false, 2)?;
    let conn = pool.connect()?;
    conn.execute("INSERT INTO t VALUES (1)", [])?;
    conn.commit()?;
    pool.release(conn);
    pool.close();

    // Read back through a per-thread pool.
    let pool = PerThreadPool::new(&test_db.path, false);
    let conn = pool.connect()?;
    let rows: Vec<i64> = conn.query("SELECT x FROM t", [], |row| row.get(0))?;
    assert_eq!(rows, vec![1], "exactly one row with value 1");
    pool.release(conn);
    pool.close();
    Ok(())
}

#[rstest]
fn test_committed_transaction_survives_close(test_db: TestDb) -> anyhow::Result<()> {
    let pool = SerializedPool::new(&test_db.path, false);
    let conn = pool.connect()?;
    conn.execute("CREATE TABLE t (x INTEGER)", [])?;
    conn.execute("BEGIN", [])?;
    for x in 0..10 {
        conn.execute("INSERT INTO t VALUES (?1)", [x])?;
    }
    conn.commit()?;
    pool.release(conn);
    pool.close();

    let pool = SerializedPool::new(&test_db.path, false);
    let conn = pool.connect()?;
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))?;
    assert_eq!(count, 10);
    pool.release(conn);
    pool.close();
    Ok(())
}
