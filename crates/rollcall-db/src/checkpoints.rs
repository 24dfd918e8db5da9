//! Crawl checkpoint store.
//!
//! Records, per group, the phase and top-level query index the last crawl
//! reached so an interrupted crawl resumes there instead of starting over.

use crate::error::Result;
use chrono::Utc;
use rollcall_core::GroupId;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};

/// Resume point of a crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Phase number, starting at 1
    pub phase: u32,
    /// Index into the top-level alphabet within `phase`
    pub index: usize,
}

impl Checkpoint {
    /// Checkpoint of a group with no crawl in progress.
    pub const CLEAN: Checkpoint = Checkpoint { phase: 1, index: 0 };

    /// Create a checkpoint for `phase` at top-level `index`.
    #[must_use]
    pub fn new(phase: u32, index: usize) -> Self {
        Self { phase, index }
    }
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self::CLEAN
    }
}

/// Get the checkpoint for a group, or [`Checkpoint::CLEAN`] if none is stored.
///
/// # Errors
/// Returns `DatabaseError::Sqlx` if the query fails.
pub async fn get(pool: &Pool<Sqlite>, group_id: GroupId) -> Result<Checkpoint> {
    let row: Option<(i64, i64)> = sqlx::query_as(
        "SELECT phase, last_query_index FROM scan_checkpoints WHERE group_id = ?",
    )
    .bind(group_id.get())
    .fetch_optional(pool)
    .await?;

    Ok(match row {
        Some((phase, index)) => Checkpoint {
            phase: u32::try_from(phase).unwrap_or(1).max(1),
            index: usize::try_from(index).unwrap_or(0),
        },
        None => Checkpoint::CLEAN,
    })
}

/// Store the checkpoint for a group, replacing any previous one.
///
/// # Errors
/// Returns `DatabaseError::Sqlx` if the write fails.
pub async fn set(pool: &Pool<Sqlite>, group_id: GroupId, checkpoint: Checkpoint) -> Result<()> {
    #[allow(clippy::cast_possible_wrap)]
    let index = checkpoint.index as i64;

    sqlx::query(
        r"
        INSERT INTO scan_checkpoints (group_id, phase, last_query_index, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(group_id) DO UPDATE SET
            phase = excluded.phase,
            last_query_index = excluded.last_query_index,
            updated_at = excluded.updated_at
        ",
    )
    .bind(group_id.get())
    .bind(i64::from(checkpoint.phase))
    .bind(index)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Mark a group as fully crawled.
///
/// # Errors
/// Returns `DatabaseError::Sqlx` if the write fails.
pub async fn reset(pool: &Pool<Sqlite>, group_id: GroupId) -> Result<()> {
    set(pool, group_id, Checkpoint::CLEAN).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn create_test_db() -> Database {
        let db = Database::new(":memory:").await.expect("create test database");
        db.run_migrations().await.expect("run migrations");
        db
    }

    #[tokio::test]
    async fn test_missing_checkpoint_is_clean() {
        let db = create_test_db().await;
        let checkpoint = get(db.pool(), GroupId::new(42)).await.expect("get checkpoint");
        assert_eq!(checkpoint, Checkpoint::CLEAN);
        assert_eq!(checkpoint, Checkpoint::new(1, 0));
    }

    #[tokio::test]
    async fn test_set_and_get_checkpoint() {
        let db = create_test_db().await;
        let group = GroupId::new(42);

        set(db.pool(), group, Checkpoint::new(1, 12))
            .await
            .expect("set checkpoint");
        set(db.pool(), group, Checkpoint::new(3, 7))
            .await
            .expect("overwrite checkpoint");

        let checkpoint = get(db.pool(), group).await.expect("get checkpoint");
        assert_eq!(checkpoint, Checkpoint::new(3, 7));

        let other = get(db.pool(), GroupId::new(43)).await.expect("get other");
        assert_eq!(other, Checkpoint::CLEAN);
    }

    #[tokio::test]
    async fn test_reset_checkpoint() {
        let db = create_test_db().await;
        let group = GroupId::new(42);

        set(db.pool(), group, Checkpoint::new(4, 70))
            .await
            .expect("set checkpoint");
        reset(db.pool(), group).await.expect("reset checkpoint");

        let checkpoint = get(db.pool(), group).await.expect("get checkpoint");
        assert_eq!(checkpoint, Checkpoint::CLEAN);
    }
}
