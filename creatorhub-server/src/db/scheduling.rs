//! Manager availability slots and creator meetings

use chrono::{DateTime, Utc};
use creatorhub_common::domain::MeetingStatus;
use creatorhub_common::time;
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqliteExecutor, SqlitePool};
use uuid::Uuid;

/// One row of `manager_availability`
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Slot {
    pub id: String,
    pub manager_id: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub is_booked: bool,
    pub created_at: DateTime<Utc>,
}

/// Slot listing filter
#[derive(Debug, Clone, Default)]
pub struct SlotFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub manager_id: Option<String>,
    pub only_open: bool,
}

const SLOT_COLUMNS: &str = "SELECT id, manager_id, starts_at, ends_at, is_booked, created_at \
     FROM manager_availability";

pub async fn insert_slot(
    db: &SqlitePool,
    manager_id: &str,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
) -> Result<Slot, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO manager_availability (id, manager_id, starts_at, ends_at, is_booked, created_at)
        VALUES (?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(&id)
    .bind(manager_id)
    .bind(starts_at)
    .bind(ends_at)
    .bind(time::now())
    .execute(db)
    .await?;

    get_slot(db, &id).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn get_slot<'e, E: SqliteExecutor<'e>>(
    exec: E,
    id: &str,
) -> Result<Option<Slot>, sqlx::Error> {
    let sql = format!("{} WHERE id = ?", SLOT_COLUMNS);
    sqlx::query_as::<_, Slot>(&sql)
        .bind(id)
        .fetch_optional(exec)
        .await
}

/// Whether the manager has a slot overlapping `[starts_at, ends_at)`
pub async fn has_overlap(
    db: &SqlitePool,
    manager_id: &str,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM manager_availability
        WHERE manager_id = ? AND starts_at < ? AND ends_at > ?
        "#,
    )
    .bind(manager_id)
    .bind(ends_at)
    .bind(starts_at)
    .fetch_one(db)
    .await?;
    Ok(count > 0)
}

pub async fn list_slots(db: &SqlitePool, filter: &SlotFilter) -> Result<Vec<Slot>, sqlx::Error> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(SLOT_COLUMNS);
    query.push(" WHERE 1 = 1");
    if let Some(from) = filter.from {
        query.push(" AND ends_at > ").push_bind(from);
    }
    if let Some(to) = filter.to {
        query.push(" AND starts_at < ").push_bind(to);
    }
    if let Some(manager_id) = &filter.manager_id {
        query.push(" AND manager_id = ").push_bind(manager_id.clone());
    }
    if filter.only_open {
        query.push(" AND is_booked = 0");
    }
    query.push(" ORDER BY starts_at ASC");
    query.build_query_as::<Slot>().fetch_all(db).await
}

/// Delete an unbooked slot; false if missing or booked
pub async fn delete_open_slot(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM manager_availability WHERE id = ? AND is_booked = 0")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Claim an open slot; false if it was already booked
pub async fn try_book_slot<'e, E: SqliteExecutor<'e>>(
    exec: E,
    id: &str,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE manager_availability SET is_booked = 1 WHERE id = ? AND is_booked = 0")
            .bind(id)
            .execute(exec)
            .await?;
    Ok(result.rows_affected() > 0)
}

/// Reopen a slot unless another scheduled meeting still holds it
pub async fn release_slot<'e, E: SqliteExecutor<'e>>(
    exec: E,
    id: &str,
    meeting_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE manager_availability SET is_booked = 0
        WHERE id = ?
          AND NOT EXISTS (
            SELECT 1 FROM creator_meetings
            WHERE slot_id = ? AND id != ? AND status = 'scheduled'
          )
        "#,
    )
    .bind(id)
    .bind(id)
    .bind(meeting_id)
    .execute(exec)
    .await?;
    Ok(result.rows_affected() > 0)
}

// ========================================
// Meetings
// ========================================

/// One row of `creator_meetings`
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Meeting {
    pub id: String,
    pub creator_id: String,
    pub manager_id: Option<String>,
    pub slot_id: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub status: MeetingStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const MEETING_COLUMNS: &str = "SELECT id, creator_id, manager_id, slot_id, scheduled_at, \
     status, notes, created_at, updated_at FROM creator_meetings";

pub async fn insert_meeting<'e, E: SqliteExecutor<'e>>(
    exec: E,
    creator_id: &str,
    manager_id: Option<&str>,
    slot_id: Option<&str>,
    scheduled_at: DateTime<Utc>,
) -> Result<String, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = time::now();
    sqlx::query(
        r#"
        INSERT INTO creator_meetings
            (id, creator_id, manager_id, slot_id, scheduled_at, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, 'scheduled', ?, ?)
        "#,
    )
    .bind(&id)
    .bind(creator_id)
    .bind(manager_id)
    .bind(slot_id)
    .bind(scheduled_at)
    .bind(now)
    .bind(now)
    .execute(exec)
    .await?;
    Ok(id)
}

pub async fn get_meeting<'e, E: SqliteExecutor<'e>>(
    exec: E,
    id: &str,
) -> Result<Option<Meeting>, sqlx::Error> {
    let sql = format!("{} WHERE id = ?", MEETING_COLUMNS);
    sqlx::query_as::<_, Meeting>(&sql)
        .bind(id)
        .fetch_optional(exec)
        .await
}

/// Meetings for one creator, or all meetings when `creator_id` is `None`
pub async fn list_meetings(
    db: &SqlitePool,
    creator_id: Option<&str>,
) -> Result<Vec<Meeting>, sqlx::Error> {
    let sql = match creator_id {
        Some(_) => format!("{} WHERE creator_id = ? ORDER BY scheduled_at ASC", MEETING_COLUMNS),
        None => format!("{} ORDER BY scheduled_at ASC", MEETING_COLUMNS),
    };
    let mut query = sqlx::query_as::<_, Meeting>(&sql);
    if let Some(creator_id) = creator_id {
        query = query.bind(creator_id);
    }
    query.fetch_all(db).await
}

/// Set status (and notes when given); false if the meeting does not exist
pub async fn set_meeting_status<'e, E: SqliteExecutor<'e>>(
    exec: E,
    id: &str,
    status: MeetingStatus,
    notes: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE creator_meetings
        SET status = ?, notes = COALESCE(?, notes), updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(status)
    .bind(notes)
    .bind(time::now())
    .bind(id)
    .execute(exec)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Move a meeting out of `from`; false if its status is no longer `from`
pub async fn transition_meeting<'e, E: SqliteExecutor<'e>>(
    exec: E,
    id: &str,
    from: MeetingStatus,
    to: MeetingStatus,
    notes: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE creator_meetings
        SET status = ?, notes = COALESCE(?, notes), updated_at = ?
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(to)
    .bind(notes)
    .bind(time::now())
    .bind(id)
    .bind(from)
    .execute(exec)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Whether the creator has at least one completed meeting
pub async fn has_completed_meeting(db: &SqlitePool, creator_id: &str) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM creator_meetings WHERE creator_id = ? AND status = 'completed'",
    )
    .bind(creator_id)
    .fetch_one(db)
    .await?;
    Ok(count > 0)
}
