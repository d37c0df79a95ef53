//! In-app notifications for the current user

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::CurrentUser;
use crate::db::{self, notifications::Notification};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Serialize)]
pub struct MarkedResponse {
    pub marked: u64,
}

/// GET /api/notifications[?unread_only=true]
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<NotificationQuery>,
) -> ApiResult<Json<Vec<Notification>>> {
    Ok(Json(
        db::notifications::list_for_user(&state.db, &user.id, query.unread_only).await?,
    ))
}

/// POST /api/notifications/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<MarkedResponse>> {
    if !db::notifications::mark_read(&state.db, &user.id, &id).await? {
        return Err(ApiError::NotFound(format!("Notification {}", id)));
    }
    Ok(Json(MarkedResponse { marked: 1 }))
}

/// POST /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<MarkedResponse>> {
    let marked = db::notifications::mark_all_read(&state.db, &user.id).await?;
    Ok(Json(MarkedResponse { marked }))
}

pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", get(list))
        .route("/api/notifications/read-all", post(mark_all_read))
        .route("/api/notifications/:id/read", post(mark_read))
}
