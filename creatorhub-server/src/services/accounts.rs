//! Account provisioning: application approval, staff accounts,
//! invitations and account deletion

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::{info, warn};

use creatorhub_common::credentials::{generate_token, hash_token, is_valid_email, normalize_email};
use creatorhub_common::domain::ApplicationStatus;
use creatorhub_common::{time, AccessLevel, Role};

use crate::api::CurrentUser;
use crate::db;
use crate::email::{send_logged, templates, EmailKind, EmailOutcome};
use crate::error::{ApiError, ApiResult};
use crate::services::notifications::{kinds, notify};
use crate::storage::Bucket;
use crate::AppState;

/// Frontend path that redeems an invitation token
pub const ACCEPT_INVITATION_PATH: &str = "/accept-invitation";

/// Raw invitation token, only ever handed to the email
struct IssuedInvitation {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Revoke the user's open invitations and issue a fresh one
async fn issue_invitation(
    conn: &mut SqliteConnection,
    state: &AppState,
    user_id: &str,
) -> ApiResult<IssuedInvitation> {
    let revoked = db::sessions::revoke_open_invitations(&mut *conn, user_id).await?;
    if revoked > 0 {
        info!(user_id, revoked, "Revoked previous invitations");
    }
    let token = generate_token();
    let expires_at = time::now() + Duration::hours(state.config.auth.invitation_ttl_hours);
    db::sessions::insert_invitation(&mut *conn, user_id, &hash_token(&token), expires_at).await?;
    Ok(IssuedInvitation { token, expires_at })
}

async fn send_invitation(
    state: &AppState,
    user_id: &str,
    email: &str,
    name: &str,
    invitation: &IssuedInvitation,
) -> EmailOutcome {
    let link = format!(
        "{}{}?token={}",
        state.config.public_base_url, ACCEPT_INVITATION_PATH, invitation.token
    );
    let message = templates::invitation(email, name, &link, invitation.expires_at);
    send_logged(
        &state.db,
        state.mailer.as_ref(),
        state.config.email.max_retries,
        Some(user_id),
        EmailKind::Invitation,
        &message,
    )
    .await
}

// ========================================
// approve-application
// ========================================

#[derive(Debug, Clone, Serialize)]
pub struct ApprovalOutcome {
    pub application_id: String,
    pub user_id: String,
    /// False when an existing profile with the same email was reused
    pub user_created: bool,
    pub access_level: AccessLevel,
    /// `None` when the reused account already has a password
    pub invitation_expires_at: Option<DateTime<Utc>>,
    pub email: Option<EmailOutcome>,
}

/// Approve a pending application and provision the creator account
pub async fn approve_application(
    state: &AppState,
    actor: &CurrentUser,
    application_id: &str,
) -> ApiResult<ApprovalOutcome> {
    let mut tx = state.db.begin().await?;

    let app = db::applications::get_application(&mut *tx, application_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Application {}", application_id)))?;
    if app.status != ApplicationStatus::Pending {
        return Err(ApiError::Conflict(format!(
            "Application is already {}",
            app.status
        )));
    }

    let email = normalize_email(&app.email);
    let found = db::profiles::get_profile_by_email(&mut *tx, &email).await?;
    let (user_id, user_created) = match found {
        Some(existing) => (existing.id, false),
        None => (
            db::profiles::insert_profile(&mut *tx, &email, &app.full_name, false).await?,
            true,
        ),
    };

    db::profiles::grant_role(&mut *tx, &user_id, Role::Creator, Some(&actor.id)).await?;

    let previous_level = db::access::get_level(&mut *tx, &user_id).await?;
    let access_level = previous_level
        .unwrap_or_default()
        .max(AccessLevel::MeetingOnly);
    if previous_level != Some(access_level) {
        db::access::upsert_level(&mut *tx, &user_id, access_level, Some(&actor.id)).await?;
        db::access::insert_audit(
            &mut *tx,
            &user_id,
            previous_level,
            access_level,
            Some(&actor.id),
            Some("Application approved"),
        )
        .await?;
    }

    if !db::applications::mark_approved(&mut *tx, application_id, &user_id, &actor.id).await? {
        return Err(ApiError::Conflict("Application is no longer pending".to_string()));
    }

    let has_password: Option<Option<String>> =
        sqlx::query_scalar("SELECT password_hash FROM profiles WHERE id = ?")
            .bind(&user_id)
            .fetch_optional(&mut *tx)
            .await?;
    let invitation = if matches!(has_password, Some(Some(_))) {
        None
    } else {
        Some(issue_invitation(&mut tx, state, &user_id).await?)
    };

    tx.commit().await?;
    info!(
        application_id,
        user_id = %user_id,
        reviewer = %actor.id,
        "Application approved"
    );

    let email_outcome = match &invitation {
        Some(invitation) => {
            Some(send_invitation(state, &user_id, &email, &app.full_name, invitation).await)
        }
        None => None,
    };
    notify(
        &state.db,
        &user_id,
        kinds::APPLICATION,
        "Application approved",
        "Your application was approved. Book an onboarding meeting to continue.",
    )
    .await;

    Ok(ApprovalOutcome {
        application_id: application_id.to_string(),
        user_id,
        user_created,
        access_level,
        invitation_expires_at: invitation.map(|i| i.expires_at),
        email: email_outcome,
    })
}

/// Reject a pending application and tell the applicant
pub async fn reject_application(
    state: &AppState,
    actor: &CurrentUser,
    application_id: &str,
    reason: Option<&str>,
) -> ApiResult<EmailOutcome> {
    let app = db::applications::get_application(&state.db, application_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Application {}", application_id)))?;
    if !db::applications::mark_rejected(&state.db, application_id, reason, &actor.id).await? {
        return Err(ApiError::Conflict(format!(
            "Application is already {}",
            app.status
        )));
    }
    info!(application_id, reviewer = %actor.id, "Application rejected");

    let message = templates::application_rejected(&app.email, &app.full_name, reason);
    Ok(send_logged(
        &state.db,
        state.mailer.as_ref(),
        state.config.email.max_retries,
        None,
        EmailKind::ApplicationRejected,
        &message,
    )
    .await)
}

// ========================================
// create-account
// ========================================

#[derive(Debug, Clone, Serialize)]
pub struct AccountOutcome {
    pub user_id: String,
    pub role: Role,
    pub invitation_expires_at: DateTime<Utc>,
    pub email: EmailOutcome,
}

/// Create a staff account and invite it
///
/// Creator accounts only come from approved applications.
pub async fn create_account(
    state: &AppState,
    actor: &CurrentUser,
    email: &str,
    full_name: &str,
    role: Role,
) -> ApiResult<AccountOutcome> {
    match role {
        Role::Creator => {
            return Err(ApiError::BadRequest(
                "Creator accounts are created by approving an application".to_string(),
            ))
        }
        Role::SuperAdmin | Role::Admin => actor.require_super_admin()?,
        _ => actor.require_admin()?,
    }

    let email = normalize_email(email);
    if !is_valid_email(&email) {
        return Err(ApiError::BadRequest("A valid email is required".to_string()));
    }
    let full_name = full_name.trim();
    if full_name.is_empty() {
        return Err(ApiError::BadRequest("Full name is required".to_string()));
    }

    let mut tx = state.db.begin().await?;
    if db::profiles::get_profile_by_email(&mut *tx, &email).await?.is_some() {
        return Err(ApiError::Conflict(format!(
            "An account for {} already exists",
            email
        )));
    }
    let user_id = db::profiles::insert_profile(&mut *tx, &email, full_name, false).await?;
    db::profiles::grant_role(&mut *tx, &user_id, role, Some(&actor.id)).await?;
    let invitation = issue_invitation(&mut tx, state, &user_id).await?;
    tx.commit().await?;

    info!(user_id = %user_id, role = %role, created_by = %actor.id, "Account created");
    let outcome = send_invitation(state, &user_id, &email, full_name, &invitation).await;

    Ok(AccountOutcome {
        user_id,
        role,
        invitation_expires_at: invitation.expires_at,
        email: outcome,
    })
}

// ========================================
// resend-invitation
// ========================================

#[derive(Debug, Clone, Serialize)]
pub struct InvitationOutcome {
    pub user_id: String,
    pub invitation_expires_at: DateTime<Utc>,
    pub email: EmailOutcome,
}

/// Replace a user's open invitations with a fresh one
pub async fn resend_invitation(state: &AppState, user_id: &str) -> ApiResult<InvitationOutcome> {
    let profile = db::profiles::get_profile(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {}", user_id)))?;
    if db::profiles::has_password(&state.db, user_id).await? {
        return Err(ApiError::Conflict(
            "User has already activated the account".to_string(),
        ));
    }

    let mut tx = state.db.begin().await?;
    let invitation = issue_invitation(&mut tx, state, user_id).await?;
    tx.commit().await?;

    let outcome =
        send_invitation(state, user_id, &profile.email, &profile.full_name, &invitation).await;
    info!(user_id, delivered = outcome.delivered, "Invitation re-sent");

    Ok(InvitationOutcome {
        user_id: user_id.to_string(),
        invitation_expires_at: invitation.expires_at,
        email: outcome,
    })
}

// ========================================
// delete-account
// ========================================

#[derive(Debug, Clone, Serialize)]
pub struct DeletionOutcome {
    pub user_id: String,
    pub deleted: bool,
    pub files_removed: usize,
    pub warnings: Vec<String>,
}

/// Delete an account and everything it owns
///
/// Guards: no self-deletion, `confirm_email` must match, the last
/// `super_admin` stays, and only a `super_admin` removes admins.
pub async fn delete_account(
    state: &AppState,
    actor: &CurrentUser,
    user_id: &str,
    confirm_email: &str,
) -> ApiResult<DeletionOutcome> {
    if actor.id == user_id {
        return Err(ApiError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }

    let profile = db::profiles::get_profile(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {}", user_id)))?;
    if normalize_email(confirm_email) != normalize_email(&profile.email) {
        return Err(ApiError::BadRequest(
            "Confirmation email does not match the account".to_string(),
        ));
    }

    let roles = db::profiles::roles_for(&state.db, user_id).await?;
    if roles.contains(&Role::SuperAdmin) || roles.contains(&Role::Admin) {
        actor.require_super_admin()?;
    }

    let contract_keys: Vec<Option<String>> =
        sqlx::query_scalar("SELECT pdf_key FROM creator_contracts WHERE creator_id = ?")
            .bind(user_id)
            .fetch_all(&state.db)
            .await?;
    let content_keys: Vec<String> =
        sqlx::query_scalar("SELECT storage_key FROM content_uploads WHERE creator_id = ?")
            .bind(user_id)
            .fetch_all(&state.db)
            .await?;
    let previous_level = db::access::get_level(&state.db, user_id).await?;

    let mut tx = state.db.begin().await?;
    if roles.contains(&Role::SuperAdmin)
        && db::profiles::count_role(&mut *tx, Role::SuperAdmin).await? <= 1
    {
        return Err(ApiError::Conflict(
            "Cannot delete the last super_admin".to_string(),
        ));
    }
    let deleted = db::profiles::delete_profile(&mut *tx, user_id).await?;
    db::access::insert_audit(
        &mut *tx,
        user_id,
        previous_level,
        AccessLevel::NoAccess,
        Some(&actor.id),
        Some(&format!("Account {} deleted", profile.email)),
    )
    .await?;
    tx.commit().await?;
    info!(user_id, deleted_by = %actor.id, "Account deleted");

    let mut warnings = Vec::new();
    let mut files_removed = 0;
    let objects = contract_keys
        .into_iter()
        .flatten()
        .map(|key| (Bucket::Contracts, key))
        .chain(content_keys.into_iter().map(|key| (Bucket::Content, key)));
    for (bucket, key) in objects {
        match state.storage.delete(bucket, &key).await {
            Ok(()) => files_removed += 1,
            Err(e) => {
                warn!(bucket = bucket.as_str(), key = %key, "Failed to remove file: {}", e);
                warnings.push(format!("File {}/{} not removed: {}", bucket.as_str(), key, e));
            }
        }
    }

    Ok(DeletionOutcome {
        user_id: user_id.to_string(),
        deleted,
        files_removed,
        warnings,
    })
}
