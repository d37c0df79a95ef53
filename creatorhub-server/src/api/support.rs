//! Support tickets

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use tracing::info;

use creatorhub_common::domain::{permissions, TicketPriority, TicketStatus};
use creatorhub_common::Role;

use crate::api::CurrentUser;
use crate::db::{self, support::Ticket};
use crate::error::{ApiError, ApiResult};
use crate::services::notifications::{kinds, notify};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub priority: TicketPriority,
}

#[derive(Debug, Deserialize)]
pub struct TicketStatusRequest {
    pub status: TicketStatus,
}

fn is_support_staff(user: &CurrentUser) -> bool {
    user.is_admin() || user.has_role(Role::Manager)
}

/// POST /api/support
pub async fn create_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateTicketRequest>,
) -> ApiResult<(StatusCode, Json<Ticket>)> {
    let subject = req.subject.trim();
    let body = req.body.trim();
    if subject.is_empty() || body.is_empty() {
        return Err(ApiError::BadRequest(
            "Subject and body are required".to_string(),
        ));
    }
    let ticket =
        db::support::insert_ticket(&state.db, &user.id, subject, body, req.priority).await?;
    info!(
        ticket_id = %ticket.id,
        user_id = %user.id,
        priority = %ticket.priority,
        "Support ticket opened"
    );
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// GET /api/support
///
/// Staff see every ticket, everyone else their own.
pub async fn list_tickets(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<Ticket>>> {
    let owner = if is_support_staff(&user) {
        None
    } else {
        Some(user.id.as_str())
    };
    Ok(Json(db::support::list_tickets(&state.db, owner).await?))
}

/// POST /api/support/:id/status
pub async fn set_status(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(req): Json<TicketStatusRequest>,
) -> ApiResult<Json<Ticket>> {
    user.require_any(&[Role::Admin, Role::Manager])?;
    user.require_permission(&state, permissions::SUPPORT_MANAGE).await?;

    let ticket = db::support::get_ticket(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Ticket {}", id)))?;
    db::support::set_ticket_status(&state.db, &id, req.status).await?;
    info!(ticket_id = %id, status = %req.status, "Support ticket updated");

    if ticket.user_id != user.id {
        notify(
            &state.db,
            &ticket.user_id,
            kinds::SUPPORT,
            "Support ticket updated",
            &format!("\"{}\" is now {}", ticket.subject, req.status),
        )
        .await;
    }

    let updated = db::support::get_ticket(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Ticket {}", id)))?;
    Ok(Json(updated))
}

pub fn support_routes() -> Router<AppState> {
    Router::new()
        .route("/api/support", get(list_tickets).post(create_ticket))
        .route("/api/support/:id/status", post(set_status))
}
