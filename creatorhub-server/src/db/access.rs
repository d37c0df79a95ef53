//! Creator access levels and their audit trail

use chrono::{DateTime, Utc};
use creatorhub_common::{time, AccessLevel};
use serde::Serialize;
use sqlx::{SqliteExecutor, SqlitePool};
use uuid::Uuid;

/// One row of `access_level_audit_log`
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AccessAuditEntry {
    pub id: String,
    pub user_id: String,
    pub previous_level: Option<AccessLevel>,
    pub new_level: AccessLevel,
    pub changed_by: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Stored access level, `None` when the user has no access row
pub async fn get_level<'e, E: SqliteExecutor<'e>>(
    exec: E,
    user_id: &str,
) -> Result<Option<AccessLevel>, sqlx::Error> {
    sqlx::query_scalar("SELECT access_level FROM creator_access_levels WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(exec)
        .await
}

/// Effective access level (`no_access` without a row)
pub async fn effective_level(db: &SqlitePool, user_id: &str) -> Result<AccessLevel, sqlx::Error> {
    Ok(get_level(db, user_id).await?.unwrap_or_default())
}

pub async fn upsert_level<'e, E: SqliteExecutor<'e>>(
    exec: E,
    user_id: &str,
    level: AccessLevel,
    updated_by: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO creator_access_levels (user_id, access_level, updated_by, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            access_level = excluded.access_level,
            updated_by = excluded.updated_by,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(user_id)
    .bind(level)
    .bind(updated_by)
    .bind(time::now())
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn insert_audit<'e, E: SqliteExecutor<'e>>(
    exec: E,
    user_id: &str,
    previous: Option<AccessLevel>,
    new_level: AccessLevel,
    changed_by: Option<&str>,
    reason: Option<&str>,
) -> Result<String, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO access_level_audit_log
            (id, user_id, previous_level, new_level, changed_by, reason, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(previous)
    .bind(new_level)
    .bind(changed_by)
    .bind(reason)
    .bind(time::now())
    .execute(exec)
    .await?;
    Ok(id)
}

/// Audit rows, newest first, optionally for one user
pub async fn list_audit(
    db: &SqlitePool,
    user_id: Option<&str>,
) -> Result<Vec<AccessAuditEntry>, sqlx::Error> {
    let base = "SELECT id, user_id, previous_level, new_level, changed_by, reason, created_at \
                FROM access_level_audit_log";
    let sql = match user_id {
        Some(_) => format!("{} WHERE user_id = ? ORDER BY created_at DESC, rowid DESC", base),
        None => format!("{} ORDER BY created_at DESC, rowid DESC", base),
    };
    let mut query = sqlx::query_as::<_, AccessAuditEntry>(&sql);
    if let Some(user_id) = user_id {
        query = query.bind(user_id);
    }
    query.fetch_all(db).await
}
