//! Profile endpoints

use axum::{
    extract::State,
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};

use creatorhub_common::domain::permissions;
use creatorhub_common::{AccessLevel, Role};

use crate::api::CurrentUser;
use crate::db::{self, profiles::Profile, profiles::ProfileUpdate};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ProfileWithRoles {
    #[serde(flatten)]
    pub profile: Profile,
    pub roles: Vec<Role>,
    pub access_level: AccessLevel,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub stage_name: Option<String>,
    pub phone: Option<String>,
    pub timezone: Option<String>,
}

/// Blank strings mean "leave unchanged"
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// GET /api/profiles/me
pub async fn get_me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<ProfileWithRoles>> {
    let profile = db::profiles::get_profile(&state.db, &user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {}", user.id)))?;
    Ok(Json(ProfileWithRoles {
        profile,
        roles: user.roles,
        access_level: user.access_level,
    }))
}

/// PATCH /api/profiles/me
pub async fn update_me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<Profile>> {
    if let Some(name) = &req.full_name {
        if name.trim().is_empty() {
            return Err(ApiError::BadRequest("Full name cannot be empty".to_string()));
        }
    }
    let update = ProfileUpdate {
        full_name: non_blank(req.full_name),
        stage_name: non_blank(req.stage_name),
        phone: non_blank(req.phone),
        timezone: non_blank(req.timezone),
    };
    let profile = db::profiles::update_profile(&state.db, &user.id, &update)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {}", user.id)))?;
    Ok(Json(profile))
}

/// GET /api/profiles
pub async fn list_profiles(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<ProfileWithRoles>>> {
    user.require_any(&[Role::Admin, Role::Manager])?;
    user.require_permission(&state, permissions::PROFILES_VIEW_ALL).await?;

    let profiles = db::profiles::list_profiles(&state.db).await?;
    let mut result = Vec::with_capacity(profiles.len());
    for profile in profiles {
        let roles = db::profiles::roles_for(&state.db, &profile.id).await?;
        let access_level = db::access::effective_level(&state.db, &profile.id).await?;
        result.push(ProfileWithRoles {
            profile,
            roles,
            access_level,
        });
    }
    Ok(Json(result))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/api/profiles", get(list_profiles))
        .route("/api/profiles/me", get(get_me).patch(update_me))
}
