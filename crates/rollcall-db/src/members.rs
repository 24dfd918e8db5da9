//! Member store.
//!
//! One row per (member, group). Writes are idempotent upserts: observing a
//! member again overwrites every field with the latest observation, so
//! concurrent batches from different queries commute.

use crate::error::{DatabaseError, Result};
use chrono::Utc;
use rollcall_core::{GroupId, MemberId, RecencyTier};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, QueryBuilder, Row, Sqlite};
use std::collections::HashSet;

/// A member as stored for one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    /// Platform user id
    pub id: MemberId,
    /// Group the member was observed in
    pub group_id: GroupId,
    /// Public username, if any
    pub username: Option<String>,
    /// First name (empty if unset)
    pub first_name: String,
    /// Last name (empty if unset)
    pub last_name: String,
    /// Phone number, if visible
    pub phone: Option<String>,
    /// Whether the account is a bot
    pub is_bot: bool,
    /// Recency tier at the time of the latest observation
    pub tier: RecencyTier,
}

const UPSERT_SQL: &str = "INSERT INTO members (id, group_id, username, first_name, last_name, phone, is_bot, tier, updated_at)
     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
     ON CONFLICT(id, group_id) DO UPDATE SET
        username = excluded.username,
        first_name = excluded.first_name,
        last_name = excluded.last_name,
        phone = excluded.phone,
        is_bot = excluded.is_bot,
        tier = excluded.tier,
        updated_at = excluded.updated_at";

const SELECT_COLUMNS: &str =
    "SELECT id, group_id, username, first_name, last_name, phone, is_bot, tier FROM members";

/// Upsert a batch of member records for `group_id` in a single transaction.
///
/// The records' own `group_id` is ignored in favour of the argument so a
/// batch can never straddle groups.
///
/// # Errors
/// Returns `DatabaseError::Sqlx` if any write fails; the whole batch is
/// rolled back.
pub async fn upsert_batch(
    pool: &Pool<Sqlite>,
    group_id: GroupId,
    records: &[MemberRecord],
) -> Result<()> {
    if records.is_empty() {
        return Ok(());
    }

    let updated_at = Utc::now().to_rfc3339();
    let mut tx = pool.begin().await?;

    for record in records {
        sqlx::query(UPSERT_SQL)
            .bind(record.id.get())
            .bind(group_id.get())
            .bind(record.username.as_deref())
            .bind(&record.first_name)
            .bind(&record.last_name)
            .bind(record.phone.as_deref())
            .bind(record.is_bot)
            .bind(record.tier.as_str())
            .bind(&updated_at)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    tracing::trace!("Upserted {} members for group {}", records.len(), group_id);
    Ok(())
}

/// Upsert a single member record.
///
/// # Errors
/// Returns `DatabaseError::Sqlx` if the write fails.
pub async fn upsert_one(pool: &Pool<Sqlite>, record: &MemberRecord) -> Result<()> {
    upsert_batch(pool, record.group_id, std::slice::from_ref(record)).await
}

/// Read every member on record for a group, ordered by member id.
///
/// # Errors
/// Returns `DatabaseError` if the query fails or a stored tier is unknown.
pub async fn read_all(pool: &Pool<Sqlite>, group_id: GroupId) -> Result<Vec<MemberRecord>> {
    let rows = sqlx::query(&format!("{SELECT_COLUMNS} WHERE group_id = ? ORDER BY id"))
        .bind(group_id.get())
        .fetch_all(pool)
        .await?;

    rows.iter().map(parse_member_row).collect()
}

/// Read the members of a group whose tier is one of `tiers`.
///
/// An empty `tiers` slice matches nothing.
///
/// # Errors
/// Returns `DatabaseError` if the query fails or a stored tier is unknown.
pub async fn read_by_tiers(
    pool: &Pool<Sqlite>,
    group_id: GroupId,
    tiers: &[RecencyTier],
) -> Result<Vec<MemberRecord>> {
    if tiers.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
    query.push(" WHERE group_id = ").push_bind(group_id.get());
    query.push(" AND tier IN (");
    let mut separated = query.separated(", ");
    for tier in tiers {
        separated.push_bind(tier.as_str());
    }
    separated.push_unseparated(") ORDER BY id");

    let rows = query.build().fetch_all(pool).await?;
    rows.iter().map(parse_member_row).collect()
}

/// Ids of every member on record for a group.
///
/// # Errors
/// Returns `DatabaseError::Sqlx` if the query fails.
pub async fn member_ids(pool: &Pool<Sqlite>, group_id: GroupId) -> Result<HashSet<MemberId>> {
    let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM members WHERE group_id = ?")
        .bind(group_id.get())
        .fetch_all(pool)
        .await?;

    Ok(ids.into_iter().map(MemberId::new).collect())
}

/// Number of members on record for a group.
///
/// # Errors
/// Returns `DatabaseError::Sqlx` if the query fails.
pub async fn count(pool: &Pool<Sqlite>, group_id: GroupId) -> Result<u64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM members WHERE group_id = ?")
        .bind(group_id.get())
        .fetch_one(pool)
        .await?;

    Ok(u64::try_from(count).unwrap_or(0))
}

fn parse_member_row(row: &SqliteRow) -> Result<MemberRecord> {
    let tier_label: String = row.try_get("tier")?;
    let tier = tier_label.parse::<RecencyTier>().map_err(|e| {
        DatabaseError::Decode(format!("invalid tier '{tier_label}' in members table: {e}"))
    })?;

    Ok(MemberRecord {
        id: MemberId::new(row.try_get("id")?),
        group_id: GroupId::new(row.try_get("group_id")?),
        username: row.try_get("username")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        phone: row.try_get("phone")?,
        is_bot: row.try_get("is_bot")?,
        tier,
    })
}
