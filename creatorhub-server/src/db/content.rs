//! Creator content uploads

use chrono::{DateTime, Utc};
use creatorhub_common::domain::UploadStatus;
use creatorhub_common::time;
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

/// One row of `content_uploads`
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Upload {
    pub id: String,
    pub creator_id: String,
    pub file_name: String,
    #[serde(skip)]
    pub storage_key: String,
    pub content_type: Option<String>,
    pub size_bytes: i64,
    pub caption: Option<String>,
    pub status: UploadStatus,
    pub feedback: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

const UPLOAD_COLUMNS: &str = "SELECT id, creator_id, file_name, storage_key, content_type, \
     size_bytes, caption, status, feedback, reviewed_by, reviewed_at, created_at \
     FROM content_uploads";

pub async fn insert_upload(
    db: &SqlitePool,
    creator_id: &str,
    file_name: &str,
    storage_key: &str,
    content_type: Option<&str>,
    size_bytes: i64,
    caption: Option<&str>,
) -> Result<Upload, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO content_uploads (
            id, creator_id, file_name, storage_key, content_type, size_bytes,
            caption, status, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, 'pending_review', ?)
        "#,
    )
    .bind(&id)
    .bind(creator_id)
    .bind(file_name)
    .bind(storage_key)
    .bind(content_type)
    .bind(size_bytes)
    .bind(caption)
    .bind(time::now())
    .execute(db)
    .await?;

    get_upload(db, &id).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn get_upload(db: &SqlitePool, id: &str) -> Result<Option<Upload>, sqlx::Error> {
    let sql = format!("{} WHERE id = ?", UPLOAD_COLUMNS);
    sqlx::query_as::<_, Upload>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn list_uploads(
    db: &SqlitePool,
    creator_id: Option<&str>,
    status: Option<UploadStatus>,
) -> Result<Vec<Upload>, sqlx::Error> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(UPLOAD_COLUMNS);
    query.push(" WHERE 1 = 1");
    if let Some(creator_id) = creator_id {
        query.push(" AND creator_id = ").push_bind(creator_id.to_string());
    }
    if let Some(status) = status {
        query.push(" AND status = ").push_bind(status);
    }
    query.push(" ORDER BY created_at DESC");
    query.build_query_as::<Upload>().fetch_all(db).await
}

pub async fn review_upload(
    db: &SqlitePool,
    id: &str,
    status: UploadStatus,
    feedback: Option<&str>,
    reviewer: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE content_uploads
        SET status = ?, feedback = ?, reviewed_by = ?, reviewed_at = ?
        WHERE id = ?
        "#,
    )
    .bind(status)
    .bind(feedback)
    .bind(reviewer)
    .bind(time::now())
    .bind(id)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_uploads(
    db: &SqlitePool,
    creator_id: Option<&str>,
    status: Option<UploadStatus>,
) -> Result<i64, sqlx::Error> {
    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT COUNT(*) FROM content_uploads WHERE 1 = 1");
    if let Some(creator_id) = creator_id {
        query.push(" AND creator_id = ").push_bind(creator_id.to_string());
    }
    if let Some(status) = status {
        query.push(" AND status = ").push_bind(status);
    }
    query.build_query_scalar::<i64>().fetch_one(db).await
}
