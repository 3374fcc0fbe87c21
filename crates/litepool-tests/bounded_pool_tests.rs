//! Bounded pool tests
//!
//! The bounded strategy promises at most `capacity` connections checked
//! out at once, blocking excess callers until a release, and a silent
//! drop for handles it does not recognize as its own.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use litepool::{BoundedPool, ConnectionPool, DEFAULT_CAPACITY, PerThreadPool, PoolError};
use rstest::rstest;

use crate::fixtures::{TestDb, test_db};

#[rstest]
fn test_construction_prefills_to_capacity(test_db: TestDb) -> anyhow::Result<()> {
    let pool = BoundedPool::with_capacity(&test_db.path, false, 3)?;
    let stats = pool.stats();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.idle, 3);
    assert_eq!(stats.active, 0);
    assert_eq!(pool.capacity(), 3);
    pool.close();
    Ok(())
}

#[rstest]
fn test_default_capacity(test_db: TestDb) -> anyhow::Result<()> {
    let pool = BoundedPool::new(&test_db.path, false)?;
    assert_eq!(pool.capacity(), DEFAULT_CAPACITY);
    assert_eq!(pool.stats().idle, DEFAULT_CAPACITY);
    pool.close();
    Ok(())
}

#[rstest]
fn test_released_connection_is_reused(test_db: TestDb) -> anyhow::Result<()> {
    let pool = BoundedPool::with_capacity(&test_db.path, false, 1)?;

    let first = pool.connect()?;
    let first_ptr = Arc::as_ptr(&first) as usize;
    pool.release(first);

    let second = pool.connect()?;
    assert_eq!(
        Arc::as_ptr(&second) as usize,
        first_ptr,
        "the sole connection should cycle through the queue"
    );
    pool.release(second);
    pool.close();
    Ok(())
}

/// The concrete capacity-2 scenario: A and B connect immediately, C
/// blocks, and A's release unblocks C within a bounded window, leaving
/// exactly two handles checked out and none available.
#[rstest]
fn test_excess_connect_blocks_until_release(test_db: TestDb) -> anyhow::Result<()> {
    let pool = BoundedPool::with_capacity(&test_db.path, false, 2)?;

    let conn_a = pool.connect()?;
    let _conn_b = pool.connect()?;
    assert_eq!(pool.stats().active, 2);

    let (acquired_tx, acquired_rx) = mpsc::channel();
    let (done_tx, done_rx) = mpsc::channel::<()>();

    thread::scope(|s| {
        let pool = &pool;
        s.spawn(move || {
            let conn_c = pool.connect().expect("blocked connect");
            acquired_tx.send(()).expect("send");
            // Hold the connection until the main thread has finished
            // inspecting the pool.
            let _ = done_rx.recv();
            pool.release(conn_c);
        });

        assert!(
            acquired_rx.recv_timeout(Duration::from_millis(150)).is_err(),
            "third connect should block while both connections are out"
        );

        pool.release(conn_a);
        assert!(
            acquired_rx.recv_timeout(Duration::from_secs(5)).is_ok(),
            "blocked connect should complete shortly after a release"
        );

        let stats = pool.stats();
        assert_eq!(stats.active, 2, "exactly B and C should be checked out");
        assert_eq!(stats.idle, 0);

        done_tx.send(()).expect("send done");
    });

    pool.close();
    Ok(())
}

#[rstest]
fn test_foreign_handle_release_is_dropped(test_db: TestDb) -> anyhow::Result<()> {
    let pool = BoundedPool::with_capacity(&test_db.path, false, 2)?;

    let other_dir = tempfile::tempdir()?;
    let other_path = other_dir
        .path()
        .join("other.sqlite3")
        .to_string_lossy()
        .into_owned();
    let other_pool = PerThreadPool::new(&other_path, false);
    let foreign = other_pool.connect()?;

    let idle_before = pool.stats().idle;
    pool.release(foreign);
    assert_eq!(
        pool.stats().idle,
        idle_before,
        "an unrecognized handle must not grow the available set"
    );
    assert_eq!(pool.stats().total, 2);

    other_pool.close();
    pool.close();
    Ok(())
}

#[rstest]
fn test_close_drains_and_tears_down_everything(test_db: TestDb) -> anyhow::Result<()> {
    let pool = BoundedPool::with_capacity(&test_db.path, false, 3)?;

    // One checked out and never returned, two sitting in the queue.
    let checked_out = pool.connect()?;

    pool.close();
    assert!(
        checked_out.is_closed(),
        "close must also cover connections that were never returned"
    );
    assert_eq!(pool.stats().total, 0);

    // Second close is a no-op; connect is refused.
    pool.close();
    assert!(matches!(pool.connect(), Err(PoolError::Closed)));

    // Releasing after close just drops the handle.
    pool.release(checked_out);
    assert_eq!(pool.stats().idle, 0);
    Ok(())
}

/// Closing while a connection is in use closes it out from under the
/// user; the pool attempts no coordination.
#[rstest]
fn test_close_while_checked_out_invalidates_handle(test_db: TestDb) -> anyhow::Result<()> {
    let pool = BoundedPool::with_capacity(&test_db.path, false, 1)?;
    let conn = pool.connect()?;
    conn.execute("CREATE TABLE items (id INTEGER)", [])?;

    pool.close();
    let err = conn.execute("INSERT INTO items (id) VALUES (1)", []).unwrap_err();
    assert!(matches!(err, PoolError::Connection(_)));
    Ok(())
}

#[rstest]
fn test_blocked_connect_observes_close(test_db: TestDb) -> anyhow::Result<()> {
    let pool = BoundedPool::with_capacity(&test_db.path, false, 1)?;
    let _held = pool.connect()?;

    thread::scope(|s| {
        let pool = &pool;
        let blocked = s.spawn(move || pool.connect());

        // Let the spawned thread reach the wait before closing.
        thread::sleep(Duration::from_millis(100));
        pool.close();

        let result = blocked.join().expect("join");
        assert!(
            matches!(result, Err(PoolError::Closed)),
            "a waiter must fail fast once the pool closes"
        );
    });
    Ok(())
}
