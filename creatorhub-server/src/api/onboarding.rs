//! Onboarding questionnaire and progress

use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use tracing::info;

use creatorhub_common::AccessLevel;

use crate::api::CurrentUser;
use crate::db::{self, onboarding::StepResponse};
use crate::error::{ApiError, ApiResult};
use crate::services::onboarding::{self, OnboardingProgress};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SaveStepRequest {
    pub answers: serde_json::Value,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    pub user_id: Option<String>,
}

/// PUT /api/onboarding/steps/:step
pub async fn save_step(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(step): Path<String>,
    Json(req): Json<SaveStepRequest>,
) -> ApiResult<Json<Vec<StepResponse>>> {
    user.require_creator_access(AccessLevel::FullAccess)?;
    if !onboarding::is_known_step(&step) {
        return Err(ApiError::BadRequest(format!(
            "Unknown onboarding step '{}'",
            step
        )));
    }
    if !req.answers.is_object() {
        return Err(ApiError::BadRequest("answers must be an object".to_string()));
    }

    db::onboarding::upsert_response(&state.db, &user.id, &step, &req.answers, req.completed)
        .await?;
    info!(user_id = %user.id, step = %step, completed = req.completed, "Onboarding step saved");
    Ok(Json(db::onboarding::responses_for(&state.db, &user.id).await?))
}

/// GET /api/onboarding/progress[?user_id=]
pub async fn progress(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ProgressQuery>,
) -> ApiResult<Json<OnboardingProgress>> {
    let user_id = query.user_id.unwrap_or_else(|| user.id.clone());
    user.require_self_or_staff(&user_id)?;
    Ok(Json(onboarding::load_progress(&state.db, &user_id).await?))
}

/// GET /api/onboarding/responses
pub async fn responses(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<StepResponse>>> {
    Ok(Json(db::onboarding::responses_for(&state.db, &user.id).await?))
}

pub fn onboarding_routes() -> Router<AppState> {
    Router::new()
        .route("/api/onboarding/steps/:step", put(save_step))
        .route("/api/onboarding/responses", get(responses))
        .route("/api/onboarding/progress", get(progress))
}
