//! Shared helpers for unit tests that need a real SQLite store.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tempfile::TempDir;

/// A scratch database in a temp directory, with foreign keys enabled the
/// same way the production pool configures them. The `TempDir` must be kept
/// alive for the lifetime of the pool.
pub async fn test_pool() -> (TempDir, SqlitePool) {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("test.sqlite");

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
        .unwrap()
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(2)
        .connect_with(options)
        .await
        .unwrap();

    (tmp, pool)
}
