//! Scan mode preference store.

use crate::error::{DatabaseError, Result};
use chrono::Utc;
use rollcall_core::{GroupId, ScanMode};
use sqlx::{Pool, Sqlite};

/// Get the scan mode stored for a group, if any.
///
/// # Errors
/// Returns `DatabaseError::Decode` if the stored mode is unknown.
pub async fn get(pool: &Pool<Sqlite>, group_id: GroupId) -> Result<Option<ScanMode>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT scan_mode FROM group_prefs WHERE group_id = ?")
        .bind(group_id.get())
        .fetch_optional(pool)
        .await?;

    match row {
        Some((label,)) => label
            .parse::<ScanMode>()
            .map(Some)
            .map_err(|e| DatabaseError::Decode(format!("invalid scan_mode for group {group_id}: {e}"))),
        None => Ok(None),
    }
}

/// Store the scan mode for a group, replacing any previous choice.
///
/// # Errors
/// Returns `DatabaseError::Sqlx` if the write fails.
pub async fn set(pool: &Pool<Sqlite>, group_id: GroupId, mode: ScanMode) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO group_prefs (group_id, scan_mode, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT(group_id) DO UPDATE SET
            scan_mode = excluded.scan_mode,
            updated_at = excluded.updated_at
        ",
    )
    .bind(group_id.get())
    .bind(mode.as_str())
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    tracing::debug!("Scan mode for group {} set to {}", group_id, mode);
    Ok(())
}
