//! Shared fixtures for the integration suite
//!
//! Every test gets a fresh database file inside its own temp directory;
//! the directory is removed when the fixture value drops at the end of
//! the test.

use rstest::fixture;
use tempfile::TempDir;

/// A temp directory holding a fresh database file path.
pub struct TestDb {
    // Held so the directory outlives the test body.
    _dir: TempDir,
    /// Path of the database file inside the temp directory. The file is
    /// not created until a pool opens its first connection.
    pub path: String,
}

/// A fresh on-disk database location for one test.
#[fixture]
pub fn test_db() -> TestDb {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir
        .path()
        .join("litepool.sqlite3")
        .to_string_lossy()
        .into_owned();
    TestDb { _dir: dir, path }
}
