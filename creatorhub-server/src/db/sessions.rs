//! Sessions and invitation tokens
//!
//! Only SHA-256 digests of tokens are stored; the raw token is returned to
//! the client once and never persisted.

use chrono::{DateTime, Utc};
use creatorhub_common::time;
use sqlx::{SqliteExecutor, SqlitePool};
use uuid::Uuid;

/// An active session resolved from a token hash
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRow {
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

pub async fn create_session(
    db: &SqlitePool,
    token_hash: &str,
    user_id: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
    )
    .bind(token_hash)
    .bind(user_id)
    .bind(time::now())
    .bind(expires_at)
    .execute(db)
    .await?;
    Ok(())
}

/// Session for a token hash that is neither revoked nor expired at `now`
pub async fn find_active_session(
    db: &SqlitePool,
    token_hash: &str,
    now: DateTime<Utc>,
) -> Result<Option<SessionRow>, sqlx::Error> {
    sqlx::query_as::<_, SessionRow>(
        r#"
        SELECT user_id, expires_at FROM sessions
        WHERE token_hash = ? AND revoked_at IS NULL AND expires_at > ?
        "#,
    )
    .bind(token_hash)
    .bind(now)
    .fetch_optional(db)
    .await
}

pub async fn revoke_session(db: &SqlitePool, token_hash: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE sessions SET revoked_at = ? WHERE token_hash = ? AND revoked_at IS NULL",
    )
    .bind(time::now())
    .bind(token_hash)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

// ========================================
// Invitation tokens
// ========================================

/// One row of `invitation_tokens`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InvitationRow {
    pub id: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl InvitationRow {
    /// Unused, unrevoked and not yet expired
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.used_at.is_none() && self.revoked_at.is_none() && self.expires_at > now
    }
}

pub async fn insert_invitation<'e, E: SqliteExecutor<'e>>(
    exec: E,
    user_id: &str,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<String, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO invitation_tokens (id, user_id, token_hash, created_at, expires_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(token_hash)
    .bind(time::now())
    .bind(expires_at)
    .execute(exec)
    .await?;
    Ok(id)
}

pub async fn find_invitation<'e, E: SqliteExecutor<'e>>(
    exec: E,
    token_hash: &str,
) -> Result<Option<InvitationRow>, sqlx::Error> {
    sqlx::query_as::<_, InvitationRow>(
        r#"
        SELECT id, user_id, expires_at, used_at, revoked_at
        FROM invitation_tokens WHERE token_hash = ?
        "#,
    )
    .bind(token_hash)
    .fetch_optional(exec)
    .await
}

/// Mark a token used; false if it was already used or revoked
pub async fn mark_invitation_used<'e, E: SqliteExecutor<'e>>(
    exec: E,
    id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE invitation_tokens SET used_at = ?
        WHERE id = ? AND used_at IS NULL AND revoked_at IS NULL
        "#,
    )
    .bind(time::now())
    .bind(id)
    .execute(exec)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Revoke every unused token of a user, returning how many were revoked
pub async fn revoke_open_invitations<'e, E: SqliteExecutor<'e>>(
    exec: E,
    user_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE invitation_tokens SET revoked_at = ?
        WHERE user_id = ? AND used_at IS NULL AND revoked_at IS NULL
        "#,
    )
    .bind(time::now())
    .bind(user_id)
    .execute(exec)
    .await?;
    Ok(result.rows_affected())
}
