//! Role assignment, the permission matrix and email delivery logs

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use creatorhub_common::domain::EmailStatus;
use creatorhub_common::Role;

use crate::api::CurrentUser;
use crate::db::{self, permissions::PermissionEntry};
use crate::email::logs::{list_logs, EmailLog};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

const DEFAULT_LOG_LIMIT: u32 = 100;
const MAX_LOG_LIMIT: u32 = 500;

#[derive(Debug, Deserialize)]
pub struct RoleChange {
    pub user_id: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct UserRoles {
    pub user_id: String,
    pub roles: Vec<Role>,
}

#[derive(Debug, Deserialize)]
pub struct PermissionChange {
    pub role: Role,
    pub permission: String,
}

#[derive(Debug, Serialize)]
pub struct PermissionChangeResponse {
    pub role: Role,
    pub permission: String,
    /// False when the grant already existed (or was already absent)
    pub changed: bool,
}

#[derive(Debug, Deserialize)]
pub struct PermissionCheckQuery {
    pub permission: String,
}

#[derive(Debug, Serialize)]
pub struct PermissionCheck {
    pub permission: String,
    pub granted: bool,
}

#[derive(Debug, Deserialize)]
pub struct EmailLogQuery {
    pub status: Option<String>,
    pub limit: Option<u32>,
}

/// Admin-level roles can only be handed out or taken by a super admin
fn require_role_authority(user: &CurrentUser, role: Role) -> ApiResult<()> {
    match role {
        Role::SuperAdmin | Role::Admin => user.require_super_admin(),
        _ => user.require_admin(),
    }
}

async fn user_roles(state: &AppState, user_id: &str) -> ApiResult<UserRoles> {
    if db::profiles::get_profile(&state.db, user_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("User {}", user_id)));
    }
    Ok(UserRoles {
        user_id: user_id.to_string(),
        roles: db::profiles::roles_for(&state.db, user_id).await?,
    })
}

/// GET /api/admin/roles/:user_id
pub async fn get_roles(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserRoles>> {
    user.require_admin()?;
    Ok(Json(user_roles(&state, &user_id).await?))
}

/// POST /api/admin/roles
pub async fn grant_role(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<RoleChange>,
) -> ApiResult<Json<UserRoles>> {
    require_role_authority(&user, req.role)?;
    if db::profiles::get_profile(&state.db, &req.user_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("User {}", req.user_id)));
    }
    if db::profiles::grant_role(&state.db, &req.user_id, req.role, Some(&user.id)).await? {
        info!(user_id = %req.user_id, role = %req.role, granted_by = %user.id, "Role granted");
    }
    Ok(Json(user_roles(&state, &req.user_id).await?))
}

/// DELETE /api/admin/roles
pub async fn revoke_role(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<RoleChange>,
) -> ApiResult<Json<UserRoles>> {
    require_role_authority(&user, req.role)?;
    let current = user_roles(&state, &req.user_id).await?;
    if !current.roles.contains(&req.role) {
        return Err(ApiError::NotFound(format!(
            "User {} does not hold role {}",
            req.user_id, req.role
        )));
    }
    if req.role == Role::SuperAdmin
        && db::profiles::count_role(&state.db, Role::SuperAdmin).await? <= 1
    {
        return Err(ApiError::Conflict(
            "The last super_admin cannot be removed".to_string(),
        ));
    }

    db::profiles::revoke_role(&state.db, &req.user_id, req.role).await?;
    info!(user_id = %req.user_id, role = %req.role, revoked_by = %user.id, "Role revoked");
    Ok(Json(user_roles(&state, &req.user_id).await?))
}

/// GET /api/admin/permissions
pub async fn list_permissions(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<PermissionEntry>>> {
    user.require_admin()?;
    Ok(Json(db::permissions::list_permissions(&state.db).await?))
}

async fn known_permission(state: &AppState, name: &str) -> ApiResult<()> {
    if db::permissions::permission_exists(&state.db, name).await? {
        Ok(())
    } else {
        Err(ApiError::NotFound(format!("Permission {}", name)))
    }
}

/// POST /api/admin/permissions/grant
pub async fn grant_permission(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<PermissionChange>,
) -> ApiResult<Json<PermissionChangeResponse>> {
    user.require_super_admin()?;
    known_permission(&state, &req.permission).await?;
    let changed = db::permissions::grant_permission(&state.db, req.role, &req.permission).await?;
    info!(role = %req.role, permission = %req.permission, changed, "Permission granted");
    Ok(Json(PermissionChangeResponse {
        role: req.role,
        permission: req.permission,
        changed,
    }))
}

/// POST /api/admin/permissions/revoke
pub async fn revoke_permission(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<PermissionChange>,
) -> ApiResult<Json<PermissionChangeResponse>> {
    user.require_super_admin()?;
    known_permission(&state, &req.permission).await?;
    let changed = db::permissions::revoke_permission(&state.db, req.role, &req.permission).await?;
    info!(role = %req.role, permission = %req.permission, changed, "Permission revoked");
    Ok(Json(PermissionChangeResponse {
        role: req.role,
        permission: req.permission,
        changed,
    }))
}

/// GET /api/admin/permissions/check?permission=
///
/// Open to every signed-in user; answers for the caller only.
pub async fn check_permission(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<PermissionCheckQuery>,
) -> ApiResult<Json<PermissionCheck>> {
    let granted = user.has_permission(&state, &query.permission).await?;
    Ok(Json(PermissionCheck {
        permission: query.permission,
        granted,
    }))
}

/// GET /api/admin/email-logs[?status=&limit=]
pub async fn email_logs(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<EmailLogQuery>,
) -> ApiResult<Json<Vec<EmailLog>>> {
    user.require_admin()?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<EmailStatus>)
        .transpose()?;
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT);
    Ok(Json(list_logs(&state.db, status, limit).await?))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/roles", post(grant_role).delete(revoke_role))
        .route("/api/admin/roles/:user_id", get(get_roles))
        .route("/api/admin/permissions", get(list_permissions))
        .route("/api/admin/permissions/grant", post(grant_permission))
        .route("/api/admin/permissions/revoke", post(revoke_permission))
        .route("/api/admin/permissions/check", get(check_permission))
        .route("/api/admin/email-logs", get(email_logs))
}
