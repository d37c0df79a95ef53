//! Manager availability, slot booking and onboarding meetings

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use creatorhub_common::domain::{permissions, MeetingStatus};
use creatorhub_common::{time, Role};

use crate::api::CurrentUser;
use crate::db::{
    self,
    scheduling::{Meeting, Slot, SlotFilter},
};
use crate::email::{send_logged, templates, EmailKind, EmailOutcome};
use crate::error::{ApiError, ApiResult};
use crate::services::availability::{expand_weekly, parse_weekday, validate_slot, WeeklyTemplate};
use crate::services::notifications::{kinds, notify};
use crate::AppState;

async fn require_scheduler(state: &AppState, user: &CurrentUser) -> ApiResult<()> {
    user.require_any(&[Role::Admin, Role::Manager])?;
    user.require_permission(state, permissions::AVAILABILITY_MANAGE).await
}

// ========================================
// Availability
// ========================================

#[derive(Debug, Deserialize)]
pub struct CreateSlotRequest {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// POST /api/availability
pub async fn create_slot(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateSlotRequest>,
) -> ApiResult<(StatusCode, Json<Slot>)> {
    require_scheduler(&state, &user).await?;
    let starts_at = time::truncate_to_seconds(req.starts_at);
    let ends_at = time::truncate_to_seconds(req.ends_at);
    validate_slot(starts_at, ends_at, time::now())?;

    if db::scheduling::has_overlap(&state.db, &user.id, starts_at, ends_at).await? {
        return Err(ApiError::Conflict(
            "Slot overlaps one of your existing slots".to_string(),
        ));
    }
    let slot = db::scheduling::insert_slot(&state.db, &user.id, starts_at, ends_at).await?;
    info!(slot_id = %slot.id, manager_id = %user.id, "Availability slot created");
    Ok((StatusCode::CREATED, Json(slot)))
}

#[derive(Debug, Deserialize)]
pub struct WeeklyRequest {
    /// `monday`..`sunday`, `mon`, or `1`..`7`
    pub weekday: String,
    /// `HH:MM` or `HH:MM:SS`, UTC
    pub start_time: String,
    pub end_time: String,
    pub slot_minutes: i64,
    pub weeks: u32,
}

#[derive(Debug, Serialize)]
pub struct WeeklyResponse {
    pub created: usize,
    pub skipped: usize,
    pub slots: Vec<Slot>,
}

fn parse_time(field: &str, value: &str) -> ApiResult<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value.trim(), "%H:%M:%S"))
        .map_err(|_| ApiError::BadRequest(format!("{} must be HH:MM", field)))
}

/// POST /api/availability/weekly
///
/// Slots that overlap existing availability are skipped, not rejected.
pub async fn create_weekly(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<WeeklyRequest>,
) -> ApiResult<Json<WeeklyResponse>> {
    require_scheduler(&state, &user).await?;
    let template = WeeklyTemplate {
        weekday: parse_weekday(&req.weekday)?,
        start_time: parse_time("start_time", &req.start_time)?,
        end_time: parse_time("end_time", &req.end_time)?,
        slot_minutes: req.slot_minutes,
        weeks: req.weeks,
    };
    let now = time::now();
    let candidates = expand_weekly(&template, now.date_naive(), now)?;

    let mut slots = Vec::new();
    let mut skipped = 0;
    for (starts_at, ends_at) in candidates {
        if db::scheduling::has_overlap(&state.db, &user.id, starts_at, ends_at).await? {
            skipped += 1;
            continue;
        }
        slots.push(db::scheduling::insert_slot(&state.db, &user.id, starts_at, ends_at).await?);
    }

    info!(
        manager_id = %user.id,
        created = slots.len(),
        skipped,
        "Weekly availability expanded"
    );
    Ok(Json(WeeklyResponse {
        created: slots.len(),
        skipped,
        slots,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub manager_id: Option<String>,
    #[serde(default)]
    pub only_open: bool,
}

/// GET /api/availability
pub async fn list_slots(
    State(state): State<AppState>,
    Query(query): Query<SlotQuery>,
) -> ApiResult<Json<Vec<Slot>>> {
    let filter = SlotFilter {
        from: query.from,
        to: query.to,
        manager_id: query.manager_id,
        only_open: query.only_open,
    };
    Ok(Json(db::scheduling::list_slots(&state.db, &filter).await?))
}

/// DELETE /api/availability/:id
pub async fn delete_slot(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let slot = db::scheduling::get_slot(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Slot {}", id)))?;
    if slot.manager_id != user.id && !user.is_admin() {
        return Err(ApiError::Forbidden(
            "Only the owner or an admin may delete a slot".to_string(),
        ));
    }
    if !db::scheduling::delete_open_slot(&state.db, &id).await? {
        return Err(ApiError::Conflict("Booked slots cannot be deleted".to_string()));
    }
    info!(slot_id = %id, "Availability slot deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub meeting: Meeting,
    pub email: EmailOutcome,
}

/// POST /api/availability/:id/book
pub async fn book_slot(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<BookingResponse>)> {
    if !user.has_role(Role::Creator) {
        return Err(ApiError::Forbidden("Only creators can book meetings".to_string()));
    }
    let slot = db::scheduling::get_slot(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Slot {}", id)))?;

    let mut tx = state.db.begin().await?;
    if !db::scheduling::try_book_slot(&mut *tx, &id).await? {
        return Err(ApiError::Conflict("Slot is already booked".to_string()));
    }
    let meeting_id = db::scheduling::insert_meeting(
        &mut *tx,
        &user.id,
        Some(&slot.manager_id),
        Some(&slot.id),
        slot.starts_at,
    )
    .await?;
    tx.commit().await?;

    let meeting = db::scheduling::get_meeting(&state.db, &meeting_id)
        .await?
        .ok_or_else(|| ApiError::Internal(format!("Meeting {} vanished", meeting_id)))?;
    info!(meeting_id = %meeting.id, slot_id = %slot.id, creator_id = %user.id, "Meeting booked");

    let message = templates::meeting_scheduled(&user.email, &user.full_name, slot.starts_at);
    let email = send_logged(
        &state.db,
        state.mailer.as_ref(),
        state.config.email.max_retries,
        Some(&user.id),
        EmailKind::MeetingScheduled,
        &message,
    )
    .await;
    notify(
        &state.db,
        &slot.manager_id,
        kinds::MEETING,
        "Meeting booked",
        &format!("{} booked your slot at {}", user.full_name, slot.starts_at.to_rfc3339()),
    )
    .await;

    Ok((StatusCode::CREATED, Json(BookingResponse { meeting, email })))
}

// ========================================
// Meetings
// ========================================

/// GET /api/meetings
pub async fn list_meetings(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<Meeting>>> {
    let staff = user.is_admin() || user.has_role(Role::Manager);
    let creator_filter = if staff { None } else { Some(user.id.as_str()) };
    Ok(Json(
        db::scheduling::list_meetings(&state.db, creator_filter).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct MeetingStatusRequest {
    pub status: MeetingStatus,
    pub notes: Option<String>,
}

/// POST /api/meetings/:id/status
///
/// Cancelling a scheduled meeting frees its slot. A cancelled meeting
/// cannot go back to `scheduled`.
pub async fn set_meeting_status(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(req): Json<MeetingStatusRequest>,
) -> ApiResult<Json<Meeting>> {
    user.require_any(&[Role::Admin, Role::Manager])?;
    user.require_permission(&state, permissions::MEETINGS_MANAGE).await?;

    let meeting = db::scheduling::get_meeting(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Meeting {}", id)))?;

    if meeting.status == MeetingStatus::Cancelled && req.status == MeetingStatus::Scheduled {
        return Err(ApiError::Conflict(
            "Cancelled meetings cannot be rescheduled; book a new slot".to_string(),
        ));
    }

    let mut tx = state.db.begin().await?;
    let moved = db::scheduling::transition_meeting(
        &mut *tx,
        &id,
        meeting.status,
        req.status,
        req.notes.as_deref(),
    )
    .await?;
    if !moved {
        return Err(ApiError::Conflict(format!(
            "Meeting {} changed while updating",
            id
        )));
    }
    // Only a scheduled meeting holds its slot
    if meeting.status == MeetingStatus::Scheduled && req.status == MeetingStatus::Cancelled {
        if let Some(slot_id) = &meeting.slot_id {
            db::scheduling::release_slot(&mut *tx, slot_id, &id).await?;
        }
    }
    tx.commit().await?;

    info!(meeting_id = %id, status = %req.status, actor = %user.id, "Meeting status updated");
    notify(
        &state.db,
        &meeting.creator_id,
        kinds::MEETING,
        "Meeting updated",
        &format!("Your onboarding meeting is now {}", req.status),
    )
    .await;

    let updated = db::scheduling::get_meeting(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Meeting {}", id)))?;
    Ok(Json(updated))
}

pub fn availability_routes() -> Router<AppState> {
    Router::new()
        .route("/api/availability", get(list_slots).post(create_slot))
        .route("/api/availability/weekly", post(create_weekly))
        .route("/api/availability/:id", delete(delete_slot))
        .route("/api/availability/:id/book", post(book_slot))
}

pub fn meeting_routes() -> Router<AppState> {
    Router::new()
        .route("/api/meetings", get(list_meetings))
        .route("/api/meetings/:id/status", post(set_meeting_status))
}
