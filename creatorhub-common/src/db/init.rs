//! Database initialization
//!
//! Opens (or creates) the SQLite database, applies the schema and seeds
//! default permissions and settings. Safe to run on every startup.

use crate::domain::{permissions, Role};
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use super::schema::create_all_tables;

/// Current schema version recorded in `settings`
pub const SCHEMA_VERSION: i64 = 1;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Per-connection pragmas
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    apply_schema(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the full schema
///
/// Every connection to `:memory:` is a separate database, so the pool is
/// pinned to one connection that never expires.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    apply_schema(&pool).await?;

    Ok(pool)
}

/// Create tables, seed permissions and default settings
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    create_all_tables(pool).await?;
    seed_permissions(pool).await?;
    init_default_settings(pool).await?;
    Ok(())
}

/// Insert known permissions and their default role grants
///
/// Uses INSERT OR IGNORE: grants revoked by an administrator are restored
/// only for permissions that did not exist before.
async fn seed_permissions(pool: &SqlitePool) -> Result<()> {
    for &(name, description) in permissions::ALL {
        let inserted =
            sqlx::query("INSERT OR IGNORE INTO permissions (name, description) VALUES (?, ?)")
                .bind(name)
                .bind(description)
                .execute(pool)
                .await?
                .rows_affected();

        if inserted == 0 {
            continue;
        }

        for role in Role::ALL {
            if permissions::default_grants(*role).contains(&name) {
                sqlx::query(
                    "INSERT OR IGNORE INTO role_permissions (role, permission) VALUES (?, ?)",
                )
                .bind(role.as_str())
                .bind(name)
                .execute(pool)
                .await?;
            }
        }
    }
    Ok(())
}

/// Initialize default settings
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, "schema_version", &SCHEMA_VERSION.to_string()).await?;
    ensure_setting(pool, "invoice_payment_terms_days", "14").await?;
    ensure_setting(pool, "content_max_upload_bytes", &(25 * 1024 * 1024).to_string()).await?;
    Ok(())
}

/// Insert a setting if absent (or NULL)
pub async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value) VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value WHERE settings.value IS NULL
        "#,
    )
    .bind(key)
    .bind(default_value)
    .execute(pool)
    .await?;
    Ok(())
}

/// Read a setting value
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;
    Ok(value.flatten())
}
