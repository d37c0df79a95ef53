//! Team dashboards: shared notes, PPV scripts and per-team counters
//!
//! A team is reachable by its members, managers and admins.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use creatorhub_common::domain::{permissions, ApplicationStatus, Team, UploadStatus};
use creatorhub_common::Role;

use crate::api::CurrentUser;
use crate::db::{
    self,
    team::{PpvScript, TeamNote},
};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

fn parse_team(value: &str) -> ApiResult<Team> {
    value
        .parse::<Team>()
        .map_err(|_| ApiError::NotFound(format!("Team {}", value)))
}

/// Resolve the team and check the caller may see it
fn team_for(user: &CurrentUser, value: &str) -> ApiResult<Team> {
    let team = parse_team(value)?;
    if user.has_role(team.member_role()) || user.has_role(Role::Manager) || user.is_admin() {
        Ok(team)
    } else {
        Err(ApiError::Forbidden(format!("Not a member of the {} team", team)))
    }
}

/// Scripts live on the chat team only
fn chat_team(user: &CurrentUser, value: &str) -> ApiResult<()> {
    match team_for(user, value)? {
        Team::Chat => Ok(()),
        other => Err(ApiError::NotFound(format!("Scripts for team {}", other))),
    }
}

fn require_author_or_admin(user: &CurrentUser, author_id: &str) -> ApiResult<()> {
    if user.id == author_id || user.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "Only the author or an admin may change this".to_string(),
        ))
    }
}

fn required(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        Err(ApiError::BadRequest(format!("{} is required", field)))
    } else {
        Ok(())
    }
}

// ========================================
// Notes
// ========================================

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub pinned: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub pinned: Option<bool>,
}

/// GET /api/team/:team/notes
pub async fn list_notes(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(team): Path<String>,
) -> ApiResult<Json<Vec<TeamNote>>> {
    let team = team_for(&user, &team)?;
    Ok(Json(db::team::list_notes(&state.db, team).await?))
}

/// POST /api/team/:team/notes
pub async fn create_note(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(team): Path<String>,
    Json(req): Json<CreateNoteRequest>,
) -> ApiResult<(StatusCode, Json<TeamNote>)> {
    let team = team_for(&user, &team)?;
    user.require_permission(&state, permissions::TEAM_NOTES_WRITE).await?;
    required("title", &req.title)?;

    let note = db::team::insert_note(
        &state.db,
        team,
        &user.id,
        req.title.trim(),
        &req.body,
        req.pinned,
    )
    .await?;
    info!(note_id = %note.id, team = %team, author = %user.id, "Team note created");
    Ok((StatusCode::CREATED, Json(note)))
}

async fn load_note(state: &AppState, team: Team, id: &str) -> ApiResult<TeamNote> {
    db::team::get_note(&state.db, id)
        .await?
        .filter(|note| note.team == team)
        .ok_or_else(|| ApiError::NotFound(format!("Note {}", id)))
}

/// PUT /api/team/:team/notes/:id
pub async fn update_note(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((team, id)): Path<(String, String)>,
    Json(req): Json<UpdateNoteRequest>,
) -> ApiResult<Json<TeamNote>> {
    let team = team_for(&user, &team)?;
    let note = load_note(&state, team, &id).await?;
    require_author_or_admin(&user, &note.author_id)?;
    if let Some(title) = &req.title {
        required("title", title)?;
    }

    let updated = db::team::update_note(
        &state.db,
        &id,
        req.title.as_deref().map(str::trim),
        req.body.as_deref(),
        req.pinned,
    )
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Note {}", id)))?;
    Ok(Json(updated))
}

/// DELETE /api/team/:team/notes/:id
pub async fn delete_note(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((team, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let team = team_for(&user, &team)?;
    let note = load_note(&state, team, &id).await?;
    require_author_or_admin(&user, &note.author_id)?;
    db::team::delete_note(&state.db, &id).await?;
    info!(note_id = %id, team = %team, "Team note deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ========================================
// PPV scripts
// ========================================

#[derive(Debug, Deserialize)]
pub struct CreateScriptRequest {
    pub title: String,
    pub body: String,
    pub price_cents: i64,
    pub creator_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateScriptRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub price_cents: Option<i64>,
    pub creator_id: Option<String>,
}

fn check_price(price_cents: i64) -> ApiResult<()> {
    if price_cents < 0 {
        Err(ApiError::BadRequest("price_cents cannot be negative".to_string()))
    } else {
        Ok(())
    }
}

async fn check_creator(state: &AppState, creator_id: Option<&str>) -> ApiResult<()> {
    if let Some(creator_id) = creator_id {
        if db::profiles::get_profile(&state.db, creator_id).await?.is_none() {
            return Err(ApiError::BadRequest(format!("Unknown creator {}", creator_id)));
        }
    }
    Ok(())
}

/// GET /api/team/chat/scripts
pub async fn list_scripts(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(team): Path<String>,
) -> ApiResult<Json<Vec<PpvScript>>> {
    chat_team(&user, &team)?;
    Ok(Json(db::team::list_scripts(&state.db).await?))
}

/// POST /api/team/chat/scripts
pub async fn create_script(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(team): Path<String>,
    Json(req): Json<CreateScriptRequest>,
) -> ApiResult<(StatusCode, Json<PpvScript>)> {
    chat_team(&user, &team)?;
    user.require_permission(&state, permissions::PPV_SCRIPTS_WRITE).await?;
    required("title", &req.title)?;
    check_price(req.price_cents)?;
    check_creator(&state, req.creator_id.as_deref()).await?;

    let script = db::team::insert_script(
        &state.db,
        &user.id,
        req.title.trim(),
        &req.body,
        req.price_cents,
        req.creator_id.as_deref(),
    )
    .await?;
    info!(script_id = %script.id, author = %user.id, "PPV script created");
    Ok((StatusCode::CREATED, Json(script)))
}

/// PUT /api/team/chat/scripts/:id
pub async fn update_script(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((team, id)): Path<(String, String)>,
    Json(req): Json<UpdateScriptRequest>,
) -> ApiResult<Json<PpvScript>> {
    chat_team(&user, &team)?;
    user.require_permission(&state, permissions::PPV_SCRIPTS_WRITE).await?;
    let script = db::team::get_script(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Script {}", id)))?;
    require_author_or_admin(&user, &script.author_id)?;
    if let Some(title) = &req.title {
        required("title", title)?;
    }
    if let Some(price) = req.price_cents {
        check_price(price)?;
    }
    check_creator(&state, req.creator_id.as_deref()).await?;

    let updated = db::team::update_script(
        &state.db,
        &id,
        req.title.as_deref().map(str::trim),
        req.body.as_deref(),
        req.price_cents,
        req.creator_id.as_deref(),
    )
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Script {}", id)))?;
    Ok(Json(updated))
}

/// DELETE /api/team/chat/scripts/:id
pub async fn delete_script(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((team, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    chat_team(&user, &team)?;
    user.require_permission(&state, permissions::PPV_SCRIPTS_WRITE).await?;
    let script = db::team::get_script(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Script {}", id)))?;
    require_author_or_admin(&user, &script.author_id)?;
    db::team::delete_script(&state.db, &id).await?;
    info!(script_id = %id, "PPV script deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ========================================
// Dashboard
// ========================================

#[derive(Debug, Serialize)]
pub struct TeamDashboard {
    pub team: Team,
    pub notes: i64,
    pub pinned_notes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scripts: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_content_reviews: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_applications: Option<i64>,
}

/// GET /api/team/:team/dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(team): Path<String>,
) -> ApiResult<Json<TeamDashboard>> {
    let team = team_for(&user, &team)?;
    let (notes, pinned_notes) = db::team::note_counts(&state.db, team).await?;

    let mut dashboard = TeamDashboard {
        team,
        notes,
        pinned_notes,
        scripts: None,
        pending_content_reviews: None,
        pending_applications: None,
    };
    match team {
        Team::Chat => dashboard.scripts = Some(db::team::count_scripts(&state.db).await?),
        Team::Studio => {
            dashboard.pending_content_reviews = Some(
                db::content::count_uploads(&state.db, None, Some(UploadStatus::PendingReview))
                    .await?,
            )
        }
        Team::Marketing => {
            dashboard.pending_applications = Some(
                db::applications::count_with_status(&state.db, ApplicationStatus::Pending).await?,
            )
        }
    }
    Ok(Json(dashboard))
}

pub fn team_routes() -> Router<AppState> {
    Router::new()
        .route("/api/team/:team/notes", get(list_notes).post(create_note))
        .route(
            "/api/team/:team/notes/:id",
            put(update_note).delete(delete_note),
        )
        .route("/api/team/:team/scripts", get(list_scripts).post(create_script))
        .route(
            "/api/team/:team/scripts/:id",
            put(update_script).delete(delete_script),
        )
        .route("/api/team/:team/dashboard", get(dashboard))
}
