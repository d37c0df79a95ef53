//! Creator access levels

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};

use creatorhub_common::domain::permissions;
use creatorhub_common::{AccessLevel, Role};

use crate::api::CurrentUser;
use crate::db::{self, access::AccessAuditEntry};
use crate::error::{ApiError, ApiResult};
use crate::services::access::{grant_access, GrantOutcome, GrantRequest};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct GrantAccessRequest {
    pub user_id: String,
    pub access_level: AccessLevel,
    pub reason: Option<String>,
    pub meeting_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccessLevelResponse {
    pub user_id: String,
    pub access_level: AccessLevel,
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub user_id: Option<String>,
}

/// POST /api/access/grant
pub async fn grant(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<GrantAccessRequest>,
) -> ApiResult<Json<GrantOutcome>> {
    user.require_any(&[Role::Admin, Role::Manager])?;
    user.require_permission(&state, permissions::ACCESS_GRANT).await?;

    let request = GrantRequest {
        user_id: req.user_id,
        access_level: req.access_level,
        reason: req.reason.filter(|r| !r.trim().is_empty()),
        meeting_id: req.meeting_id.filter(|m| !m.trim().is_empty()),
    };
    Ok(Json(grant_access(&state, &user.id, &request).await?))
}

/// GET /api/access/:user_id
pub async fn get_level(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<AccessLevelResponse>> {
    user.require_self_or_staff(&user_id)?;
    if db::profiles::get_profile(&state.db, &user_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("User {}", user_id)));
    }
    let access_level = db::access::effective_level(&state.db, &user_id).await?;
    Ok(Json(AccessLevelResponse {
        user_id,
        access_level,
    }))
}

/// GET /api/access/audit[?user_id=]
pub async fn audit(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Json<Vec<AccessAuditEntry>>> {
    user.require_any(&[Role::Admin, Role::Manager])?;
    Ok(Json(
        db::access::list_audit(&state.db, query.user_id.as_deref()).await?,
    ))
}

pub fn access_routes() -> Router<AppState> {
    Router::new()
        .route("/api/access/grant", post(grant))
        .route("/api/access/audit", get(audit))
        .route("/api/access/:user_id", get(get_level))
}
