//! Profiles, credentials and role assignments

use chrono::{DateTime, Utc};
use creatorhub_common::{time, Role};
use serde::Serialize;
use sqlx::{SqliteExecutor, SqlitePool};
use uuid::Uuid;

/// One row of `profiles` (password hash excluded)
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub stage_name: Option<String>,
    pub phone: Option<String>,
    pub timezone: Option<String>,
    pub is_test_data: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editable profile fields; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub stage_name: Option<String>,
    pub phone: Option<String>,
    pub timezone: Option<String>,
}

const PROFILE_COLUMNS: &str =
    "id, email, full_name, stage_name, phone, timezone, is_test_data, created_at, updated_at";

/// Insert a profile without a password and return its id
pub async fn insert_profile<'e, E: SqliteExecutor<'e>>(
    exec: E,
    email: &str,
    full_name: &str,
    is_test_data: bool,
) -> Result<String, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = time::now();
    sqlx::query(
        r#"
        INSERT INTO profiles (id, email, full_name, is_test_data, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(email)
    .bind(full_name)
    .bind(is_test_data)
    .bind(now)
    .bind(now)
    .execute(exec)
    .await?;
    Ok(id)
}

pub async fn get_profile<'e, E: SqliteExecutor<'e>>(
    exec: E,
    id: &str,
) -> Result<Option<Profile>, sqlx::Error> {
    let sql = format!("SELECT {} FROM profiles WHERE id = ?", PROFILE_COLUMNS);
    sqlx::query_as::<_, Profile>(&sql)
        .bind(id)
        .fetch_optional(exec)
        .await
}

/// Look up a profile by (already normalized) email
pub async fn get_profile_by_email<'e, E: SqliteExecutor<'e>>(
    exec: E,
    email: &str,
) -> Result<Option<Profile>, sqlx::Error> {
    let sql = format!("SELECT {} FROM profiles WHERE email = ?", PROFILE_COLUMNS);
    sqlx::query_as::<_, Profile>(&sql)
        .bind(email)
        .fetch_optional(exec)
        .await
}

/// (user id, password hash) for sign-in
pub async fn get_credentials(
    db: &SqlitePool,
    email: &str,
) -> Result<Option<(String, Option<String>)>, sqlx::Error> {
    sqlx::query_as("SELECT id, password_hash FROM profiles WHERE email = ?")
        .bind(email)
        .fetch_optional(db)
        .await
}

/// Whether the user has ever set a password
pub async fn has_password(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let hash: Option<Option<String>> =
        sqlx::query_scalar("SELECT password_hash FROM profiles WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await?;
    Ok(matches!(hash, Some(Some(_))))
}

pub async fn set_password_hash<'e, E: SqliteExecutor<'e>>(
    exec: E,
    id: &str,
    hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE profiles SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(hash)
        .bind(time::now())
        .bind(id)
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn update_profile(
    db: &SqlitePool,
    id: &str,
    update: &ProfileUpdate,
) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE profiles SET
            full_name = COALESCE(?, full_name),
            stage_name = COALESCE(?, stage_name),
            phone = COALESCE(?, phone),
            timezone = COALESCE(?, timezone),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&update.full_name)
    .bind(&update.stage_name)
    .bind(&update.phone)
    .bind(&update.timezone)
    .bind(time::now())
    .bind(id)
    .execute(db)
    .await?;
    get_profile(db, id).await
}

pub async fn list_profiles(db: &SqlitePool) -> Result<Vec<Profile>, sqlx::Error> {
    let sql = format!("SELECT {} FROM profiles ORDER BY created_at ASC", PROFILE_COLUMNS);
    sqlx::query_as::<_, Profile>(&sql).fetch_all(db).await
}

/// Delete a profile; owned rows go with it through ON DELETE CASCADE
pub async fn delete_profile<'e, E: SqliteExecutor<'e>>(
    exec: E,
    id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM profiles WHERE id = ?")
        .bind(id)
        .execute(exec)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ========================================
// Roles
// ========================================

/// Roles held by a user, highest ranked first
pub async fn roles_for<'e, E: SqliteExecutor<'e>>(
    exec: E,
    user_id: &str,
) -> Result<Vec<Role>, sqlx::Error> {
    let mut roles: Vec<Role> = sqlx::query_scalar("SELECT role FROM user_roles WHERE user_id = ?")
        .bind(user_id)
        .fetch_all(exec)
        .await?;
    roles.sort_by_key(|r| std::cmp::Reverse(r.rank()));
    Ok(roles)
}

/// Grant a role; returns false if it was already held
pub async fn grant_role<'e, E: SqliteExecutor<'e>>(
    exec: E,
    user_id: &str,
    role: Role,
    granted_by: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO user_roles (user_id, role, granted_by, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(role)
    .bind(granted_by)
    .bind(time::now())
    .execute(exec)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Revoke a role; returns false if it was not held
pub async fn revoke_role(db: &SqlitePool, user_id: &str, role: Role) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM user_roles WHERE user_id = ? AND role = ?")
        .bind(user_id)
        .bind(role)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_role<'e, E: SqliteExecutor<'e>>(
    exec: E,
    role: Role,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM user_roles WHERE role = ?")
        .bind(role)
        .fetch_one(exec)
        .await
}
