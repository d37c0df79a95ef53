//! Integration tests for on-disk database initialization

use creatorhub_common::config::RootFolder;
use creatorhub_common::db::{init_database, missing_tables, table_names};

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let root = RootFolder::new(dir.path().join("hub"));
    root.ensure_directory_exists().unwrap();

    let db_path = root.database_path();
    assert!(!db_path.exists());

    let pool = init_database(&db_path).await.unwrap();
    assert!(db_path.exists(), "Database file was not created");
    assert!(root.storage_path().is_dir());

    let missing = missing_tables(&pool).await.unwrap();
    assert!(missing.is_empty(), "missing tables: {:?}", missing);
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("creatorhub.db");

    let pool = init_database(&db_path).await.unwrap();
    sqlx::query(
        "INSERT INTO profiles (id, email, full_name, created_at, updated_at) \
         VALUES ('u1', 'a@example.com', 'A', '2026-01-01T00:00:00+00:00', '2026-01-01T00:00:00+00:00')",
    )
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;

    let pool = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1, "existing rows must survive re-initialization");
}

#[tokio::test]
async fn test_foreign_keys_cascade_on_every_connection() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("creatorhub.db")).await.unwrap();

    sqlx::query(
        "INSERT INTO profiles (id, email, full_name, created_at, updated_at) \
         VALUES ('u1', 'a@example.com', 'A', '2026-01-01T00:00:00+00:00', '2026-01-01T00:00:00+00:00')",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO user_roles (user_id, role, created_at) \
         VALUES ('u1', 'creator', '2026-01-01T00:00:00+00:00')",
    )
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query("DELETE FROM profiles WHERE id = 'u1'")
        .execute(&pool)
        .await
        .unwrap();

    let roles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_roles")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(roles, 0);
}

#[test]
fn test_required_tables_listed() {
    let names = table_names();
    for table in [
        "profiles",
        "user_roles",
        "creator_applications",
        "creator_meetings",
        "creator_contracts",
        "invoices",
        "manager_availability",
        "content_uploads",
        "support_tickets",
        "notification_history",
        "email_logs",
        "access_level_audit_log",
        "permissions",
        "role_permissions",
        "team_notes",
        "ppv_scripts",
    ] {
        assert!(names.contains(&table), "{} missing from schema", table);
    }
}
