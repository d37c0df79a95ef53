//! In-app notification history

use chrono::{DateTime, Utc};
use creatorhub_common::time;
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

/// One row of `notification_history`
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

pub async fn insert_notification(
    db: &SqlitePool,
    user_id: &str,
    kind: &str,
    title: &str,
    body: &str,
) -> Result<String, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO notification_history (id, user_id, kind, title, body, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(kind)
    .bind(title)
    .bind(body)
    .bind(time::now())
    .execute(db)
    .await?;
    Ok(id)
}

/// A user's notifications, newest first
pub async fn list_for_user(
    db: &SqlitePool,
    user_id: &str,
    unread_only: bool,
) -> Result<Vec<Notification>, sqlx::Error> {
    let filter = if unread_only { " AND read_at IS NULL" } else { "" };
    let sql = format!(
        "SELECT id, user_id, kind, title, body, read_at, created_at FROM notification_history \
         WHERE user_id = ?{} ORDER BY created_at DESC, rowid DESC",
        filter
    );
    sqlx::query_as::<_, Notification>(&sql)
        .bind(user_id)
        .fetch_all(db)
        .await
}

/// Mark one of the user's notifications read; false if not theirs or missing
pub async fn mark_read(db: &SqlitePool, user_id: &str, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE notification_history SET read_at = COALESCE(read_at, ?)
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(time::now())
    .bind(id)
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn mark_all_read(db: &SqlitePool, user_id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE notification_history SET read_at = ? WHERE user_id = ? AND read_at IS NULL",
    )
    .bind(time::now())
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(result.rows_affected())
}
