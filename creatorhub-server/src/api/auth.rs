//! Sessions, sign-in and the request-scoped current user
//!
//! Clients send `Authorization: Bearer <token>`. The middleware resolves
//! the token to a live session and attaches a [`CurrentUser`] extension
//! that handlers use for role and permission checks.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use creatorhub_common::credentials::{
    generate_token, hash_password, hash_token, normalize_email, validate_password_strength,
    verify_password,
};
use creatorhub_common::{time, AccessLevel, Role};

use crate::db::{self, profiles::Profile};
use crate::error::{ApiError, ApiResult};
use crate::routing;
use crate::services::onboarding;
use crate::AppState;

/// Authenticated caller, inserted by [`session_middleware`]
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
    pub full_name: String,
    /// Highest ranked first
    pub roles: Vec<Role>,
    pub access_level: AccessLevel,
    pub token_hash: String,
}

impl CurrentUser {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// `admin` or `super_admin`
    pub fn is_admin(&self) -> bool {
        self.has_role(Role::SuperAdmin) || self.has_role(Role::Admin)
    }

    pub fn is_super_admin(&self) -> bool {
        self.has_role(Role::SuperAdmin)
    }

    /// 403 unless the caller holds one of `allowed`
    ///
    /// `super_admin` satisfies any requirement that lists `admin`.
    pub fn require_any(&self, allowed: &[Role]) -> ApiResult<()> {
        let satisfied = allowed.iter().any(|role| {
            self.has_role(*role) || (*role == Role::Admin && self.is_super_admin())
        });
        if satisfied {
            Ok(())
        } else {
            let names: Vec<&str> = allowed.iter().map(Role::as_str).collect();
            Err(ApiError::Forbidden(format!(
                "Requires one of the roles: {}",
                names.join(", ")
            )))
        }
    }

    pub fn require_admin(&self) -> ApiResult<()> {
        self.require_any(&[Role::Admin])
    }

    pub fn require_super_admin(&self) -> ApiResult<()> {
        self.require_any(&[Role::SuperAdmin])
    }

    /// 403 unless one of the caller's roles is granted `permission`
    ///
    /// `super_admin` holds every permission.
    pub async fn require_permission(&self, state: &AppState, permission: &str) -> ApiResult<()> {
        if self.has_permission(state, permission).await? {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "Missing permission '{}'",
                permission
            )))
        }
    }

    pub async fn has_permission(&self, state: &AppState, permission: &str) -> ApiResult<bool> {
        if self.is_super_admin() {
            return Ok(true);
        }
        Ok(db::permissions::roles_have_permission(&state.db, &self.roles, permission).await?)
    }

    /// 403 unless the caller is a creator with at least `level`
    pub fn require_creator_access(&self, level: AccessLevel) -> ApiResult<()> {
        if !self.has_role(Role::Creator) {
            return Err(ApiError::Forbidden("Creators only".to_string()));
        }
        if self.access_level < level {
            return Err(ApiError::Forbidden(format!(
                "Requires access level {}",
                level
            )));
        }
        Ok(())
    }

    /// Staff may act on anyone, creators only on themselves
    pub fn require_self_or_staff(&self, user_id: &str) -> ApiResult<()> {
        if self.id == user_id || self.roles.iter().any(Role::is_staff) {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Not your record".to_string()))
        }
    }
}

/// Resolve the bearer token into a [`CurrentUser`]
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

    let token_hash = hash_token(token);
    let session = db::sessions::find_active_session(&state.db, &token_hash, time::now())
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Session expired or invalid".to_string()))?;

    let user = load_current_user(&state, &session.user_id, token_hash)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Session expired or invalid".to_string()))?;

    debug!(user_id = %user.id, "Authenticated request");
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

async fn load_current_user(
    state: &AppState,
    user_id: &str,
    token_hash: String,
) -> ApiResult<Option<CurrentUser>> {
    let profile = match db::profiles::get_profile(&state.db, user_id).await? {
        Some(p) => p,
        None => return Ok(None),
    };
    let roles = db::profiles::roles_for(&state.db, user_id).await?;
    let access_level = db::access::effective_level(&state.db, user_id).await?;
    Ok(Some(CurrentUser {
        id: profile.id,
        email: profile.email,
        full_name: profile.full_name,
        roles,
        access_level,
        token_hash,
    }))
}

// ========================================
// Handlers
// ========================================

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct AcceptInvitationRequest {
    pub token: String,
    pub password: String,
}

/// Issued session plus everything the client needs to route the user
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: Profile,
    pub roles: Vec<Role>,
    pub access_level: AccessLevel,
    pub redirect_to: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub user: Profile,
    pub roles: Vec<Role>,
    pub access_level: AccessLevel,
    pub redirect_to: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RedirectResponse {
    pub redirect_to: &'static str,
    pub allowed: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct RedirectQuery {
    /// Frontend path to check against the route guards
    pub path: Option<String>,
}

/// Landing route for a user, computed from current rows
pub async fn redirect_for(
    state: &AppState,
    user_id: &str,
    roles: &[Role],
    access_level: AccessLevel,
) -> ApiResult<&'static str> {
    let onboarding_complete = if roles.contains(&Role::Creator)
        && access_level == AccessLevel::FullAccess
    {
        onboarding::load_progress(&state.db, user_id)
            .await?
            .questionnaire_completed
    } else {
        false
    };
    Ok(routing::home_route(roles, access_level, onboarding_complete))
}

/// Create a session for `user_id` and build the sign-in response
async fn issue_session(state: &AppState, user_id: &str) -> ApiResult<SessionResponse> {
    let profile = db::profiles::get_profile(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {}", user_id)))?;
    let roles = db::profiles::roles_for(&state.db, user_id).await?;
    let access_level = db::access::effective_level(&state.db, user_id).await?;

    let token = generate_token();
    let expires_at = time::now() + Duration::hours(state.config.auth.session_ttl_hours);
    db::sessions::create_session(&state.db, &hash_token(&token), user_id, expires_at).await?;

    let redirect_to = redirect_for(state, user_id, &roles, access_level).await?;
    Ok(SessionResponse {
        token,
        expires_at,
        user: profile,
        roles,
        access_level,
        redirect_to,
    })
}

/// POST /api/auth/sign-in
pub async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let email = normalize_email(&req.email);
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let (user_id, hash) = db::profiles::get_credentials(&state.db, &email)
        .await?
        .ok_or_else(invalid)?;
    let hash = hash.ok_or_else(invalid)?;
    if !verify_password(&req.password, &hash) {
        warn!(user_id = %user_id, "Failed sign-in attempt");
        return Err(invalid());
    }

    let response = issue_session(&state, &user_id).await?;
    info!(user_id = %user_id, redirect = response.redirect_to, "User signed in");
    Ok(Json(response))
}

/// POST /api/auth/sign-out
pub async fn sign_out(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<serde_json::Value>> {
    db::sessions::revoke_session(&state.db, &user.token_hash).await?;
    info!(user_id = %user.id, "User signed out");
    Ok(Json(serde_json::json!({ "signed_out": true })))
}

/// GET /api/auth/session
pub async fn session(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<SessionInfo>> {
    let profile = db::profiles::get_profile(&state.db, &user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {}", user.id)))?;
    let redirect_to = redirect_for(&state, &user.id, &user.roles, user.access_level).await?;
    Ok(Json(SessionInfo {
        user: profile,
        roles: user.roles,
        access_level: user.access_level,
        redirect_to,
    }))
}

/// GET /api/auth/redirect[?path=]
pub async fn redirect(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    axum::extract::Query(query): axum::extract::Query<RedirectQuery>,
) -> ApiResult<Json<RedirectResponse>> {
    let redirect_to = redirect_for(&state, &user.id, &user.roles, user.access_level).await?;
    let allowed = query
        .path
        .as_deref()
        .map(|path| routing::route_allowed(path, &user.roles, user.access_level));
    Ok(Json(RedirectResponse {
        redirect_to,
        allowed,
    }))
}

/// POST /api/auth/accept-invitation
pub async fn accept_invitation(
    State(state): State<AppState>,
    Json(req): Json<AcceptInvitationRequest>,
) -> ApiResult<Json<SessionResponse>> {
    validate_password_strength(&req.password)?;

    let invalid = || ApiError::BadRequest("Invitation is invalid or has expired".to_string());
    let invitation = db::sessions::find_invitation(&state.db, &hash_token(req.token.trim()))
        .await?
        .ok_or_else(invalid)?;
    if !invitation.is_redeemable(time::now()) {
        return Err(invalid());
    }

    let password_hash = hash_password(&req.password)?;
    let mut tx = state.db.begin().await?;
    if !db::sessions::mark_invitation_used(&mut *tx, &invitation.id).await? {
        return Err(invalid());
    }
    db::profiles::set_password_hash(&mut *tx, &invitation.user_id, &password_hash).await?;
    tx.commit().await?;

    info!(user_id = %invitation.user_id, "Invitation accepted");
    Ok(Json(issue_session(&state, &invitation.user_id).await?))
}

/// Routes that need no session
pub fn public_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/sign-in", post(sign_in))
        .route("/api/auth/accept-invitation", post(accept_invitation))
}

/// Routes that need a session
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/sign-out", post(sign_out))
        .route("/api/auth/session", get(session))
        .route("/api/auth/redirect", get(redirect))
}
