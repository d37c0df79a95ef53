//! Team notes and PPV scripts

use chrono::{DateTime, Utc};
use creatorhub_common::domain::Team;
use creatorhub_common::time;
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

/// One row of `team_notes`
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TeamNote {
    pub id: String,
    pub team: Team,
    pub author_id: String,
    pub title: String,
    pub body: String,
    pub pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const NOTE_COLUMNS: &str =
    "SELECT id, team, author_id, title, body, pinned, created_at, updated_at FROM team_notes";

pub async fn insert_note(
    db: &SqlitePool,
    team: Team,
    author_id: &str,
    title: &str,
    body: &str,
    pinned: bool,
) -> Result<TeamNote, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = time::now();
    sqlx::query(
        r#"
        INSERT INTO team_notes (id, team, author_id, title, body, pinned, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(team)
    .bind(author_id)
    .bind(title)
    .bind(body)
    .bind(pinned)
    .bind(now)
    .bind(now)
    .execute(db)
    .await?;

    get_note(db, &id).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn get_note(db: &SqlitePool, id: &str) -> Result<Option<TeamNote>, sqlx::Error> {
    let sql = format!("{} WHERE id = ?", NOTE_COLUMNS);
    sqlx::query_as::<_, TeamNote>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Notes of a team, pinned first, then newest first
pub async fn list_notes(db: &SqlitePool, team: Team) -> Result<Vec<TeamNote>, sqlx::Error> {
    let sql = format!(
        "{} WHERE team = ? ORDER BY pinned DESC, updated_at DESC",
        NOTE_COLUMNS
    );
    sqlx::query_as::<_, TeamNote>(&sql)
        .bind(team)
        .fetch_all(db)
        .await
}

pub async fn update_note(
    db: &SqlitePool,
    id: &str,
    title: Option<&str>,
    body: Option<&str>,
    pinned: Option<bool>,
) -> Result<Option<TeamNote>, sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE team_notes SET
            title = COALESCE(?, title),
            body = COALESCE(?, body),
            pinned = COALESCE(?, pinned),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(title)
    .bind(body)
    .bind(pinned)
    .bind(time::now())
    .bind(id)
    .execute(db)
    .await?;
    get_note(db, id).await
}

pub async fn delete_note(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM team_notes WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// (all notes, pinned notes) for a team
pub async fn note_counts(db: &SqlitePool, team: Team) -> Result<(i64, i64), sqlx::Error> {
    sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(pinned), 0) FROM team_notes WHERE team = ?",
    )
    .bind(team)
    .fetch_one(db)
    .await
}

// ========================================
// PPV scripts
// ========================================

/// One row of `ppv_scripts`
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PpvScript {
    pub id: String,
    pub title: String,
    pub body: String,
    pub price_cents: i64,
    pub creator_id: Option<String>,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SCRIPT_COLUMNS: &str = "SELECT id, title, body, price_cents, creator_id, author_id, \
     created_at, updated_at FROM ppv_scripts";

pub async fn insert_script(
    db: &SqlitePool,
    author_id: &str,
    title: &str,
    body: &str,
    price_cents: i64,
    creator_id: Option<&str>,
) -> Result<PpvScript, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = time::now();
    sqlx::query(
        r#"
        INSERT INTO ppv_scripts (id, title, body, price_cents, creator_id, author_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(title)
    .bind(body)
    .bind(price_cents)
    .bind(creator_id)
    .bind(author_id)
    .bind(now)
    .bind(now)
    .execute(db)
    .await?;

    get_script(db, &id).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn get_script(db: &SqlitePool, id: &str) -> Result<Option<PpvScript>, sqlx::Error> {
    let sql = format!("{} WHERE id = ?", SCRIPT_COLUMNS);
    sqlx::query_as::<_, PpvScript>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn list_scripts(db: &SqlitePool) -> Result<Vec<PpvScript>, sqlx::Error> {
    let sql = format!("{} ORDER BY updated_at DESC", SCRIPT_COLUMNS);
    sqlx::query_as::<_, PpvScript>(&sql).fetch_all(db).await
}

pub async fn update_script(
    db: &SqlitePool,
    id: &str,
    title: Option<&str>,
    body: Option<&str>,
    price_cents: Option<i64>,
    creator_id: Option<&str>,
) -> Result<Option<PpvScript>, sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE ppv_scripts SET
            title = COALESCE(?, title),
            body = COALESCE(?, body),
            price_cents = COALESCE(?, price_cents),
            creator_id = COALESCE(?, creator_id),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(title)
    .bind(body)
    .bind(price_cents)
    .bind(creator_id)
    .bind(time::now())
    .bind(id)
    .execute(db)
    .await?;
    get_script(db, id).await
}

pub async fn delete_script(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM ppv_scripts WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_scripts(db: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM ppv_scripts")
        .fetch_one(db)
        .await
}
