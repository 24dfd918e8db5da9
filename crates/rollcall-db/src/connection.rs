//! Database connection management.
//!
//! Opens the `SQLx` connection pool that every store shares. File databases
//! run in WAL mode so concurrent crawl batches and read-backs don't block
//! each other; in-memory databases are pinned to a single connection.

use crate::error::{DatabaseError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Connections kept for a file-backed database.
const MAX_FILE_CONNECTIONS: u32 = 5;

/// How long a writer waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Open a connection pool for the database at `path`.
///
/// `:memory:` opens a private in-memory database, mostly useful in tests.
///
/// # Errors
/// Returns `DatabaseError::Open` if the path is not valid UTF-8 or the
/// database cannot be opened.
pub async fn open_pool(path: impl AsRef<Path>) -> Result<Pool<Sqlite>> {
    let path_str = path.as_ref().to_str().ok_or_else(|| {
        DatabaseError::Open("invalid database path: not valid UTF-8".to_string())
    })?;
    let in_memory = path_str == ":memory:";

    let mut connect_options = SqliteConnectOptions::from_str(path_str)
        .map_err(|e| DatabaseError::Open(format!("invalid connection string: {e}")))?
        .busy_timeout(BUSY_TIMEOUT)
        .foreign_keys(true)
        .create_if_missing(true);

    if !in_memory {
        connect_options = connect_options.journal_mode(SqliteJournalMode::Wal);
    }

    // Every connection to `:memory:` would see its own empty database, so the
    // in-memory pool holds exactly one connection for its whole life.
    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(MAX_FILE_CONNECTIONS)
    };

    let pool = pool_options
        .connect_with(connect_options)
        .await
        .map_err(|e| DatabaseError::Open(format!("failed to initialize pool: {e}")))?;

    tracing::info!("Database pool created at {}", path_str);

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory_pool() {
        let pool = open_pool(":memory:").await.expect("open pool");
        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .expect("run query");
        pool.close().await;
    }

    #[tokio::test]
    async fn test_open_file_pool_uses_wal() {
        let tmp = tempfile::TempDir::new().expect("create temp dir");
        let pool = open_pool(tmp.path().join("members.db"))
            .await
            .expect("open pool");

        let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(&pool)
            .await
            .expect("read journal mode");
        assert_eq!(mode.to_lowercase(), "wal");
        pool.close().await;
    }
}
