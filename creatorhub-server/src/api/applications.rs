//! Applicant intake endpoints
//!
//! Submission is public; review requires `admin` or `manager`. Approval
//! itself is the `approve-application` function.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use creatorhub_common::credentials::{is_valid_email, normalize_email};
use creatorhub_common::domain::{permissions, ApplicationStatus};
use creatorhub_common::Role;

use crate::api::CurrentUser;
use crate::db::{self, applications::Application, applications::NewApplication};
use crate::email::EmailOutcome;
use crate::error::{ApiError, ApiResult};
use crate::services::accounts;
use crate::AppState;

/// Raw submission as sent by the public form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationForm {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub stage_name: Option<String>,
    pub instagram_handle: Option<String>,
    pub tiktok_handle: Option<String>,
    pub onlyfans_handle: Option<String>,
    pub follower_count: Option<i64>,
    #[serde(default)]
    pub age_confirmed: bool,
    pub message: Option<String>,
}

/// Per-field validation failures
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl ApplicationForm {
    /// Validate and normalize into an insertable application
    pub fn validate(&self) -> Result<NewApplication, Vec<FieldError>> {
        let mut errors = Vec::new();

        let full_name = trimmed(&self.full_name);
        if full_name.is_none() {
            errors.push(FieldError {
                field: "full_name",
                message: "Full name is required",
            });
        }

        let email = trimmed(&self.email).map(|e| normalize_email(&e));
        match &email {
            None => errors.push(FieldError {
                field: "email",
                message: "Email is required",
            }),
            Some(e) if !is_valid_email(e) => errors.push(FieldError {
                field: "email",
                message: "Email is not valid",
            }),
            Some(_) => {}
        }

        let instagram_handle = trimmed(&self.instagram_handle);
        let tiktok_handle = trimmed(&self.tiktok_handle);
        let onlyfans_handle = trimmed(&self.onlyfans_handle);
        if instagram_handle.is_none() && tiktok_handle.is_none() && onlyfans_handle.is_none() {
            errors.push(FieldError {
                field: "social_handles",
                message: "At least one social handle is required",
            });
        }

        if matches!(self.follower_count, Some(count) if count < 0) {
            errors.push(FieldError {
                field: "follower_count",
                message: "Follower count cannot be negative",
            });
        }

        if !self.age_confirmed {
            errors.push(FieldError {
                field: "age_confirmed",
                message: "You must confirm you are at least 18",
            });
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(NewApplication {
            full_name: full_name.unwrap_or_default(),
            email: email.unwrap_or_default(),
            stage_name: trimmed(&self.stage_name),
            instagram_handle,
            tiktok_handle,
            onlyfans_handle,
            follower_count: self.follower_count,
            message: trimmed(&self.message),
        })
    }
}

fn describe(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// POST /api/applications (public)
pub async fn submit_application(
    State(state): State<AppState>,
    Json(form): Json<ApplicationForm>,
) -> ApiResult<(StatusCode, Json<Application>)> {
    let new_app = form
        .validate()
        .map_err(|errors| ApiError::BadRequest(describe(&errors)))?;

    if db::applications::has_pending_for_email(&state.db, &new_app.email).await? {
        return Err(ApiError::Conflict(
            "An application for this email is already pending".to_string(),
        ));
    }

    let app = db::applications::insert_application(&state.db, &new_app).await?;
    info!(application_id = %app.id, "Application submitted");
    Ok((StatusCode::CREATED, Json(app)))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

async fn require_reviewer(state: &AppState, user: &CurrentUser) -> ApiResult<()> {
    user.require_any(&[Role::Admin, Role::Manager])?;
    user.require_permission(state, permissions::APPLICATIONS_REVIEW).await
}

/// GET /api/applications[?status=]
pub async fn list_applications(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Application>>> {
    require_reviewer(&state, &user).await?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<ApplicationStatus>)
        .transpose()?;
    Ok(Json(db::applications::list_applications(&state.db, status).await?))
}

/// GET /api/applications/:id
pub async fn get_application(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Application>> {
    require_reviewer(&state, &user).await?;
    let app = db::applications::get_application(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Application {}", id)))?;
    Ok(Json(app))
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RejectResponse {
    pub application: Application,
    pub email: EmailOutcome,
}

/// POST /api/applications/:id/reject
pub async fn reject_application(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(req): Json<RejectRequest>,
) -> ApiResult<Json<RejectResponse>> {
    require_reviewer(&state, &user).await?;
    let reason = trimmed(&req.reason);
    let email = accounts::reject_application(&state, &user, &id, reason.as_deref()).await?;
    let application = db::applications::get_application(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Application {}", id)))?;
    Ok(Json(RejectResponse { application, email }))
}

pub fn public_application_routes() -> Router<AppState> {
    Router::new().route("/api/applications", post(submit_application))
}

pub fn application_routes() -> Router<AppState> {
    Router::new()
        .route("/api/applications", get(list_applications))
        .route("/api/applications/:id", get(get_application))
        .route("/api/applications/:id/reject", post(reject_application))
}
