//! Privileged server-side functions under `/functions/v1/*`
//!
//! Each function is a POST with a JSON body and checks the caller's role
//! before doing anything.

use axum::{extract::State, routing::post, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use creatorhub_common::{time, Role};

use crate::api::contracts::send_contract_email;
use crate::api::CurrentUser;
use crate::db;
use crate::email::{retry_failed_emails, EmailOutcome, RetryReport};
use crate::error::{ApiError, ApiResult};
use crate::services::accounts::{
    self, AccountOutcome, ApprovalOutcome, DeletionOutcome, InvitationOutcome,
};
use crate::services::smoke::{run_smoke_test, SmokeReport};
use crate::services::test_data::{create_test_data, TestDataReport};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ApproveApplicationRequest {
    pub application_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct DeleteAccountRequest {
    pub user_id: String,
    pub confirm_email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResendInvitationRequest {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ContractNotificationRequest {
    pub contract_id: String,
}

#[derive(Debug, Serialize)]
pub struct ContractNotificationResponse {
    pub contract_id: String,
    pub email: EmailOutcome,
}

/// POST /functions/v1/approve-application
pub async fn approve_application(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<ApproveApplicationRequest>,
) -> ApiResult<Json<ApprovalOutcome>> {
    user.require_any(&[Role::Admin, Role::Manager])?;
    Ok(Json(
        accounts::approve_application(&state, &user, &req.application_id).await?,
    ))
}

/// POST /functions/v1/create-account
pub async fn create_account(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateAccountRequest>,
) -> ApiResult<Json<AccountOutcome>> {
    user.require_admin()?;
    Ok(Json(
        accounts::create_account(&state, &user, &req.email, &req.full_name, req.role).await?,
    ))
}

/// POST /functions/v1/delete-account
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<DeleteAccountRequest>,
) -> ApiResult<Json<DeletionOutcome>> {
    user.require_admin()?;
    Ok(Json(
        accounts::delete_account(&state, &user, &req.user_id, &req.confirm_email).await?,
    ))
}

/// POST /functions/v1/resend-invitation
pub async fn resend_invitation(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<ResendInvitationRequest>,
) -> ApiResult<Json<InvitationOutcome>> {
    user.require_any(&[Role::Admin, Role::Manager])?;
    Ok(Json(accounts::resend_invitation(&state, &req.user_id).await?))
}

/// POST /functions/v1/retry-failed-emails
pub async fn retry_emails(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<RetryReport>> {
    user.require_admin()?;
    let report = retry_failed_emails(
        &state.db,
        state.mailer.as_ref(),
        state.config.scheduler.batch_size,
        time::now(),
    )
    .await?;
    info!(
        triggered_by = %user.id,
        examined = report.examined,
        succeeded = report.succeeded,
        failed = report.failed,
        "Manual email retry run"
    );
    Ok(Json(report))
}

/// POST /functions/v1/send-contract-notification
pub async fn send_contract_notification(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<ContractNotificationRequest>,
) -> ApiResult<Json<ContractNotificationResponse>> {
    user.require_any(&[Role::Admin, Role::Manager])?;
    let contract = db::contracts::get_contract(&state.db, &req.contract_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Contract {}", req.contract_id)))?;
    let email = send_contract_email(&state, &contract).await?;
    Ok(Json(ContractNotificationResponse {
        contract_id: contract.id,
        email,
    }))
}

/// POST /functions/v1/create-test-data
pub async fn test_data(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<TestDataReport>> {
    user.require_super_admin()?;
    if !state.config.allow_test_data {
        return Err(ApiError::Forbidden(
            "Test data creation is disabled on this server".to_string(),
        ));
    }
    Ok(Json(create_test_data(&state, &user).await?))
}

/// POST /functions/v1/smoke-test
pub async fn smoke_test(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<SmokeReport>> {
    user.require_admin()?;
    Ok(Json(run_smoke_test(&state).await))
}

pub fn function_routes() -> Router<AppState> {
    Router::new()
        .route("/functions/v1/approve-application", post(approve_application))
        .route("/functions/v1/create-account", post(create_account))
        .route("/functions/v1/delete-account", post(delete_account))
        .route("/functions/v1/resend-invitation", post(resend_invitation))
        .route("/functions/v1/retry-failed-emails", post(retry_emails))
        .route(
            "/functions/v1/send-contract-notification",
            post(send_contract_notification),
        )
        .route("/functions/v1/create-test-data", post(test_data))
        .route("/functions/v1/smoke-test", post(smoke_test))
}
