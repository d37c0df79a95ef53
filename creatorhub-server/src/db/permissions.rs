//! Permission catalogue and role grants

use creatorhub_common::Role;
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

/// A permission with the roles it is granted to
#[derive(Debug, Clone, Serialize)]
pub struct PermissionEntry {
    pub name: String,
    pub description: String,
    pub roles: Vec<Role>,
}

pub async fn list_permissions(db: &SqlitePool) -> Result<Vec<PermissionEntry>, sqlx::Error> {
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT name, description FROM permissions ORDER BY name")
            .fetch_all(db)
            .await?;
    let grants: Vec<(Role, String)> =
        sqlx::query_as("SELECT role, permission FROM role_permissions")
            .fetch_all(db)
            .await?;

    Ok(rows
        .into_iter()
        .map(|(name, description)| {
            let mut roles: Vec<Role> = grants
                .iter()
                .filter(|(_, permission)| *permission == name)
                .map(|(role, _)| *role)
                .collect();
            roles.sort_by_key(|r| std::cmp::Reverse(r.rank()));
            PermissionEntry {
                name,
                description,
                roles,
            }
        })
        .collect())
}

pub async fn permission_exists(db: &SqlitePool, name: &str) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM permissions WHERE name = ?")
        .bind(name)
        .fetch_one(db)
        .await?;
    Ok(count > 0)
}

/// Whether any of `roles` is granted `permission`
pub async fn roles_have_permission(
    db: &SqlitePool,
    roles: &[Role],
    permission: &str,
) -> Result<bool, sqlx::Error> {
    if roles.is_empty() {
        return Ok(false);
    }
    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT COUNT(*) FROM role_permissions WHERE permission = ");
    query.push_bind(permission);
    query.push(" AND role IN (");
    let mut separated = query.separated(", ");
    for role in roles {
        separated.push_bind(*role);
    }
    separated.push_unseparated(")");

    let count: i64 = query.build_query_scalar().fetch_one(db).await?;
    Ok(count > 0)
}

pub async fn grant_permission(
    db: &SqlitePool,
    role: Role,
    permission: &str,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("INSERT OR IGNORE INTO role_permissions (role, permission) VALUES (?, ?)")
            .bind(role)
            .bind(permission)
            .execute(db)
            .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn revoke_permission(
    db: &SqlitePool,
    role: Role,
    permission: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM role_permissions WHERE role = ? AND permission = ?")
        .bind(role)
        .bind(permission)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}
