//! Access-level grant workflow
//!
//! Four dependent writes run in order:
//!
//! 1. upsert the creator's access row
//! 2. insert an audit row with the previous and new level
//! 3. complete the onboarding meeting (only with a meeting id and `full_access`)
//! 4. send the access-granted email
//!
//! Only step 1 can fail the workflow. Failures in steps 2-4 are logged,
//! collected as warnings and the remaining steps still run. Nothing is
//! rolled back. Any level may be granted from any level.

use serde::Serialize;
use tracing::{info, warn};

use creatorhub_common::domain::MeetingStatus;
use creatorhub_common::{AccessLevel, Role};

use crate::db;
use crate::email::{send_logged, templates, EmailKind, EmailOutcome};
use crate::error::{ApiError, ApiResult};
use crate::routing;
use crate::services::notifications::{kinds, notify};
use crate::AppState;

/// Grant request after parsing
#[derive(Debug, Clone)]
pub struct GrantRequest {
    pub user_id: String,
    pub access_level: AccessLevel,
    pub reason: Option<String>,
    pub meeting_id: Option<String>,
}

/// What the workflow did
#[derive(Debug, Clone, Serialize)]
pub struct GrantOutcome {
    pub user_id: String,
    pub previous_level: Option<AccessLevel>,
    pub new_level: AccessLevel,
    pub audit_id: Option<String>,
    pub meeting_completed: bool,
    pub email: EmailOutcome,
    pub warnings: Vec<String>,
}

/// Run the grant workflow on behalf of `actor_id`
pub async fn grant_access(
    state: &AppState,
    actor_id: &str,
    req: &GrantRequest,
) -> ApiResult<GrantOutcome> {
    let profile = db::profiles::get_profile(&state.db, &req.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {}", req.user_id)))?;
    let roles = db::profiles::roles_for(&state.db, &req.user_id).await?;
    if !roles.contains(&Role::Creator) {
        return Err(ApiError::BadRequest(
            "Access levels apply to creators only".to_string(),
        ));
    }

    let previous_level = db::access::get_level(&state.db, &req.user_id).await?;
    let mut warnings = Vec::new();

    // Step 1 (fatal)
    db::access::upsert_level(&state.db, &req.user_id, req.access_level, Some(actor_id)).await?;
    info!(
        user_id = %req.user_id,
        previous = ?previous_level,
        new = %req.access_level,
        "Access level updated"
    );

    // Step 2
    let audit_id = match db::access::insert_audit(
        &state.db,
        &req.user_id,
        previous_level,
        req.access_level,
        Some(actor_id),
        req.reason.as_deref(),
    )
    .await
    {
        Ok(id) => Some(id),
        Err(e) => {
            warn!(user_id = %req.user_id, "Access audit insert failed: {}", e);
            warnings.push(format!("Audit log not written: {}", e));
            None
        }
    };

    // Step 3
    let mut meeting_completed = false;
    if let (Some(meeting_id), AccessLevel::FullAccess) = (&req.meeting_id, req.access_level) {
        match complete_meeting(state, meeting_id, &req.user_id).await {
            Ok(()) => meeting_completed = true,
            Err(message) => {
                warn!(meeting_id = %meeting_id, "Meeting status update failed: {}", message);
                warnings.push(format!("Meeting not updated: {}", message));
            }
        }
    }

    // Step 4
    let link = format!("{}{}", state.config.public_base_url, routing::LOGIN);
    let email =
        templates::access_granted(&profile.email, &profile.full_name, req.access_level, &link);
    let outcome = send_logged(
        &state.db,
        state.mailer.as_ref(),
        state.config.email.max_retries,
        Some(&req.user_id),
        EmailKind::AccessGranted,
        &email,
    )
    .await;
    if let Some(error) = &outcome.error {
        warnings.push(format!("Access email not delivered: {}", error));
    }

    notify(
        &state.db,
        &req.user_id,
        kinds::ACCESS,
        "Access updated",
        &format!("Your access level is now {}", req.access_level),
    )
    .await;

    Ok(GrantOutcome {
        user_id: req.user_id.clone(),
        previous_level,
        new_level: req.access_level,
        audit_id,
        meeting_completed,
        email: outcome,
        warnings,
    })
}

async fn complete_meeting(state: &AppState, meeting_id: &str, user_id: &str) -> Result<(), String> {
    let meeting = db::scheduling::get_meeting(&state.db, meeting_id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("meeting {} not found", meeting_id))?;
    if meeting.creator_id != user_id {
        return Err(format!("meeting {} belongs to another creator", meeting_id));
    }
    db::scheduling::set_meeting_status(&state.db, meeting_id, MeetingStatus::Completed, None)
        .await
        .map_err(|e| e.to_string())?;
    Ok(())
}
