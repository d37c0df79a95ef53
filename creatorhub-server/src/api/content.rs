//! Creator content uploads and review

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use tracing::{info, warn};

use creatorhub_common::domain::{permissions, UploadStatus};
use creatorhub_common::{AccessLevel, Role};

use crate::api::contracts::read_capped;
use crate::api::{setting_or, CurrentUser};
use crate::db::{self, content::Upload};
use crate::error::{ApiError, ApiResult};
use crate::services::notifications::{kinds, notify};
use crate::storage::{sanitize_file_name, Bucket, Storage};
use crate::AppState;

const MAX_UPLOAD_SETTING: &str = "content_max_upload_bytes";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub file_name: String,
    pub caption: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub creator_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub status: UploadStatus,
    pub feedback: Option<String>,
}

const REVIEWER_ROLES: &[Role] = &[Role::Admin, Role::Manager, Role::Studio];

fn is_reviewer(user: &CurrentUser) -> bool {
    user.is_admin() || REVIEWER_ROLES.iter().any(|role| user.has_role(*role))
}

/// POST /api/content?file_name=&caption=
pub async fn upload(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Body,
) -> ApiResult<(StatusCode, Json<Upload>)> {
    user.require_creator_access(AccessLevel::FullAccess)?;
    if query.file_name.trim().is_empty() {
        return Err(ApiError::BadRequest("file_name is required".to_string()));
    }

    let limit: usize = setting_or(&state, MAX_UPLOAD_SETTING, DEFAULT_MAX_UPLOAD_BYTES).await?;
    let bytes = read_capped(body, limit).await?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Empty upload".to_string()));
    }

    let file_name = sanitize_file_name(&query.file_name);
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let caption = query.caption.as_deref().map(str::trim).filter(|c| !c.is_empty());

    let key = Storage::object_key(&user.id, &file_name);
    state.storage.put(Bucket::Content, &key, &bytes).await?;
    let inserted = db::content::insert_upload(
        &state.db,
        &user.id,
        &file_name,
        &key,
        content_type.as_deref(),
        bytes.len() as i64,
        caption,
    )
    .await;
    let upload = match inserted {
        Ok(upload) => upload,
        Err(e) => {
            if let Err(cleanup) = state.storage.delete(Bucket::Content, &key).await {
                warn!(key = %key, "Failed to remove orphaned upload: {}", cleanup);
            }
            return Err(e.into());
        }
    };

    info!(
        upload_id = %upload.id,
        creator_id = %user.id,
        size = upload.size_bytes,
        "Content uploaded"
    );
    Ok((StatusCode::CREATED, Json(upload)))
}

/// GET /api/content[?creator_id=&status=]
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Upload>>> {
    let creator_filter = if is_reviewer(&user) {
        query.creator_id
    } else {
        Some(user.id.clone())
    };
    let status = query
        .status
        .as_deref()
        .map(str::parse::<UploadStatus>)
        .transpose()?;
    Ok(Json(
        db::content::list_uploads(&state.db, creator_filter.as_deref(), status).await?,
    ))
}

/// GET /api/content/:id/file
pub async fn download(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let upload = db::content::get_upload(&state.db, &id)
        .await?
        .filter(|u| u.creator_id == user.id || is_reviewer(&user))
        .ok_or_else(|| ApiError::NotFound(format!("Upload {}", id)))?;
    let bytes = state.storage.get(Bucket::Content, &upload.storage_key).await?;

    let content_type = upload
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        upload.file_name
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

/// POST /api/content/:id/review
pub async fn review(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(req): Json<ReviewRequest>,
) -> ApiResult<Json<Upload>> {
    user.require_any(REVIEWER_ROLES)?;
    user.require_permission(&state, permissions::CONTENT_REVIEW).await?;
    if req.status == UploadStatus::PendingReview {
        return Err(ApiError::BadRequest(
            "Review status must be approved or rejected".to_string(),
        ));
    }

    let upload = db::content::get_upload(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Upload {}", id)))?;
    let feedback = req.feedback.as_deref().map(str::trim).filter(|f| !f.is_empty());
    db::content::review_upload(&state.db, &id, req.status, feedback, &user.id).await?;
    info!(upload_id = %id, status = %req.status, reviewer = %user.id, "Content reviewed");

    notify(
        &state.db,
        &upload.creator_id,
        kinds::CONTENT,
        &format!("Content {}", req.status),
        &format!("\"{}\" was {}", upload.file_name, req.status),
    )
    .await;

    let updated = db::content::get_upload(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Upload {}", id)))?;
    Ok(Json(updated))
}

pub fn content_routes() -> Router<AppState> {
    Router::new()
        .route("/api/content", get(list).post(upload))
        .route("/api/content/:id/file", get(download))
        .route("/api/content/:id/review", post(review))
}
