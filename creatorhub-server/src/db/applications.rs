//! Creator applications

use chrono::{DateTime, Utc};
use creatorhub_common::domain::ApplicationStatus;
use creatorhub_common::time;
use serde::Serialize;
use sqlx::{SqliteExecutor, SqlitePool};
use uuid::Uuid;

/// One row of `creator_applications`
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Application {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub stage_name: Option<String>,
    pub instagram_handle: Option<String>,
    pub tiktok_handle: Option<String>,
    pub onlyfans_handle: Option<String>,
    pub follower_count: Option<i64>,
    pub message: Option<String>,
    pub status: ApplicationStatus,
    pub rejection_reason: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Validated submission
#[derive(Debug, Clone, Default)]
pub struct NewApplication {
    pub full_name: String,
    pub email: String,
    pub stage_name: Option<String>,
    pub instagram_handle: Option<String>,
    pub tiktok_handle: Option<String>,
    pub onlyfans_handle: Option<String>,
    pub follower_count: Option<i64>,
    pub message: Option<String>,
}

const SELECT_COLUMNS: &str = "SELECT id, full_name, email, stage_name, instagram_handle, \
     tiktok_handle, onlyfans_handle, follower_count, message, status, rejection_reason, \
     reviewed_by, reviewed_at, user_id, created_at FROM creator_applications";

pub async fn insert_application(
    db: &SqlitePool,
    app: &NewApplication,
) -> Result<Application, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO creator_applications (
            id, full_name, email, stage_name, instagram_handle, tiktok_handle,
            onlyfans_handle, follower_count, message, status, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?)
        "#,
    )
    .bind(&id)
    .bind(&app.full_name)
    .bind(&app.email)
    .bind(&app.stage_name)
    .bind(&app.instagram_handle)
    .bind(&app.tiktok_handle)
    .bind(&app.onlyfans_handle)
    .bind(app.follower_count)
    .bind(&app.message)
    .bind(time::now())
    .execute(db)
    .await?;

    let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);
    sqlx::query_as::<_, Application>(&sql)
        .bind(&id)
        .fetch_one(db)
        .await
}

pub async fn get_application<'e, E: SqliteExecutor<'e>>(
    exec: E,
    id: &str,
) -> Result<Option<Application>, sqlx::Error> {
    let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);
    sqlx::query_as::<_, Application>(&sql)
        .bind(id)
        .fetch_optional(exec)
        .await
}

/// Whether a pending application exists for `email`
pub async fn has_pending_for_email(db: &SqlitePool, email: &str) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM creator_applications WHERE email = ? AND status = 'pending'",
    )
    .bind(email)
    .fetch_one(db)
    .await?;
    Ok(count > 0)
}

/// Latest application linked to a user
pub async fn latest_for_user(
    db: &SqlitePool,
    user_id: &str,
) -> Result<Option<Application>, sqlx::Error> {
    let sql = format!(
        "{} WHERE user_id = ? ORDER BY created_at DESC LIMIT 1",
        SELECT_COLUMNS
    );
    sqlx::query_as::<_, Application>(&sql)
        .bind(user_id)
        .fetch_optional(db)
        .await
}

pub async fn list_applications(
    db: &SqlitePool,
    status: Option<ApplicationStatus>,
) -> Result<Vec<Application>, sqlx::Error> {
    let sql = match status {
        Some(_) => format!("{} WHERE status = ? ORDER BY created_at DESC", SELECT_COLUMNS),
        None => format!("{} ORDER BY created_at DESC", SELECT_COLUMNS),
    };
    let mut query = sqlx::query_as::<_, Application>(&sql);
    if let Some(status) = status {
        query = query.bind(status);
    }
    query.fetch_all(db).await
}

pub async fn count_with_status(
    db: &SqlitePool,
    status: ApplicationStatus,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM creator_applications WHERE status = ?")
        .bind(status)
        .fetch_one(db)
        .await
}

/// Approve a pending application; false if it was no longer pending
pub async fn mark_approved<'e, E: SqliteExecutor<'e>>(
    exec: E,
    id: &str,
    user_id: &str,
    reviewer: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE creator_applications
        SET status = 'approved', user_id = ?, reviewed_by = ?, reviewed_at = ?
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(user_id)
    .bind(reviewer)
    .bind(time::now())
    .bind(id)
    .execute(exec)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Reject a pending application; false if it was no longer pending
pub async fn mark_rejected(
    db: &SqlitePool,
    id: &str,
    reason: Option<&str>,
    reviewer: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE creator_applications
        SET status = 'rejected', rejection_reason = ?, reviewed_by = ?, reviewed_at = ?
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(reason)
    .bind(reviewer)
    .bind(time::now())
    .bind(id)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}
