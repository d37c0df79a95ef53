//! Contract lifecycle: draft → sent → signed, or voided before signing

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use creatorhub_common::domain::{permissions, ContractStatus};
use creatorhub_common::{Error, Role};

use crate::api::CurrentUser;
use crate::db::{self, contracts::Contract};
use crate::email::{send_logged, templates, EmailKind, EmailOutcome};
use crate::error::{ApiError, ApiResult};
use crate::services::notifications::{kinds, notify};
use crate::storage::{Bucket, Storage};
use crate::AppState;

/// Upload cap for contract PDFs
pub const MAX_PDF_BYTES: usize = 10 * 1024 * 1024;

const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, Deserialize)]
pub struct CreateContractRequest {
    pub creator_id: String,
    pub title: String,
    pub terms: String,
    pub revenue_share_percent: i64,
}

#[derive(Debug, Deserialize)]
pub struct SignRequest {
    pub signature_name: String,
}

#[derive(Debug, Serialize)]
pub struct ContractActionResponse {
    pub contract: Contract,
    pub email: Option<EmailOutcome>,
}

async fn require_manager(state: &AppState, user: &CurrentUser) -> ApiResult<()> {
    user.require_any(&[Role::Admin, Role::Manager])?;
    user.require_permission(state, permissions::CONTRACTS_MANAGE).await
}

fn is_manager(user: &CurrentUser) -> bool {
    user.is_admin() || user.has_role(Role::Manager)
}

/// Load a contract the caller may see; creators only see their own
async fn load_visible(state: &AppState, user: &CurrentUser, id: &str) -> ApiResult<Contract> {
    let contract = db::contracts::get_contract(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Contract {}", id)))?;
    if contract.creator_id != user.id && !is_manager(user) {
        return Err(ApiError::NotFound(format!("Contract {}", id)));
    }
    Ok(contract)
}

/// Whether a typed signature matches the profile name
pub fn signature_matches(signature: &str, full_name: &str) -> bool {
    let signature = signature.trim();
    !signature.is_empty() && signature.to_lowercase() == full_name.trim().to_lowercase()
}

/// Email the creator about the contract in its current status
///
/// Draft contracts have nothing to announce.
pub async fn send_contract_email(state: &AppState, contract: &Contract) -> ApiResult<EmailOutcome> {
    let creator = db::profiles::get_profile(&state.db, &contract.creator_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {}", contract.creator_id)))?;

    let (kind, message) = match contract.status {
        ContractStatus::Draft => {
            return Err(ApiError::BadRequest(
                "Draft contracts have not been sent".to_string(),
            ))
        }
        ContractStatus::Sent => {
            let link = format!(
                "{}/creator/contracts/{}",
                state.config.public_base_url, contract.id
            );
            (
                EmailKind::ContractSent,
                templates::contract_sent(
                    &creator.email,
                    &creator.full_name,
                    &contract.title,
                    &link,
                ),
            )
        }
        ContractStatus::Signed => (
            EmailKind::ContractSigned,
            templates::contract_signed(&creator.email, &creator.full_name, &contract.title),
        ),
        ContractStatus::Voided => (
            EmailKind::ContractVoided,
            templates::contract_voided(&creator.email, &creator.full_name, &contract.title),
        ),
    };

    Ok(send_logged(
        &state.db,
        state.mailer.as_ref(),
        state.config.email.max_retries,
        Some(&creator.id),
        kind,
        &message,
    )
    .await)
}

/// Apply a lifecycle move or answer 409
async fn move_to(
    state: &AppState,
    contract: &Contract,
    to: ContractStatus,
    signature_name: Option<&str>,
) -> ApiResult<Contract> {
    contract.status.ensure_transition(to)?;
    if !db::contracts::transition(&state.db, &contract.id, contract.status, to, signature_name)
        .await?
    {
        // Lost a race with another status change
        return Err(Error::illegal_transition("Contract", contract.status, to).into());
    }
    info!(contract_id = %contract.id, from = %contract.status, to = %to, "Contract transitioned");
    db::contracts::get_contract(&state.db, &contract.id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Contract {}", contract.id)))
}

/// POST /api/contracts
pub async fn create_contract(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateContractRequest>,
) -> ApiResult<(StatusCode, Json<Contract>)> {
    require_manager(&state, &user).await?;
    if !(0..=100).contains(&req.revenue_share_percent) {
        return Err(ApiError::BadRequest(
            "revenue_share_percent must be between 0 and 100".to_string(),
        ));
    }
    let title = req.title.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest("Title is required".to_string()));
    }
    let roles = db::profiles::roles_for(&state.db, &req.creator_id).await?;
    if !roles.contains(&Role::Creator) {
        return Err(ApiError::BadRequest(format!(
            "User {} is not a creator",
            req.creator_id
        )));
    }

    let contract = db::contracts::insert_contract(
        &state.db,
        &req.creator_id,
        title,
        &req.terms,
        req.revenue_share_percent,
        Some(&user.id),
    )
    .await?;
    info!(contract_id = %contract.id, creator_id = %contract.creator_id, "Contract drafted");
    Ok((StatusCode::CREATED, Json(contract)))
}

/// GET /api/contracts
pub async fn list_contracts(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<Contract>>> {
    let creator_filter = if is_manager(&user) {
        None
    } else {
        Some(user.id.as_str())
    };
    Ok(Json(
        db::contracts::list_contracts(&state.db, creator_filter).await?,
    ))
}

/// GET /api/contracts/:id
pub async fn get_contract(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Contract>> {
    Ok(Json(load_visible(&state, &user, &id).await?))
}

/// POST /api/contracts/:id/send
pub async fn send_contract(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<ContractActionResponse>> {
    require_manager(&state, &user).await?;
    let contract = load_visible(&state, &user, &id).await?;
    let contract = move_to(&state, &contract, ContractStatus::Sent, None).await?;

    let email = send_contract_email(&state, &contract).await?;
    notify(
        &state.db,
        &contract.creator_id,
        kinds::CONTRACT,
        "Contract ready to sign",
        &format!("\"{}\" is waiting for your signature", contract.title),
    )
    .await;
    Ok(Json(ContractActionResponse {
        contract,
        email: Some(email),
    }))
}

/// POST /api/contracts/:id/sign
pub async fn sign_contract(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(req): Json<SignRequest>,
) -> ApiResult<Json<ContractActionResponse>> {
    let contract = load_visible(&state, &user, &id).await?;
    if contract.creator_id != user.id {
        return Err(ApiError::Forbidden(
            "Only the creator can sign this contract".to_string(),
        ));
    }
    if !signature_matches(&req.signature_name, &user.full_name) {
        return Err(ApiError::BadRequest(
            "Signature must match your full name".to_string(),
        ));
    }
    let contract = move_to(
        &state,
        &contract,
        ContractStatus::Signed,
        Some(req.signature_name.trim()),
    )
    .await?;

    let email = send_contract_email(&state, &contract).await?;
    if let Some(created_by) = &contract.created_by {
        notify(
            &state.db,
            created_by,
            kinds::CONTRACT,
            "Contract signed",
            &format!("{} signed \"{}\"", user.full_name, contract.title),
        )
        .await;
    }
    Ok(Json(ContractActionResponse {
        contract,
        email: Some(email),
    }))
}

/// POST /api/contracts/:id/void
pub async fn void_contract(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<ContractActionResponse>> {
    user.require_admin()?;
    let contract = load_visible(&state, &user, &id).await?;
    let previous = contract.status;
    let contract = move_to(&state, &contract, ContractStatus::Voided, None).await?;

    // Creators never saw a draft, so only a sent contract is announced
    let email = if previous == ContractStatus::Sent {
        Some(send_contract_email(&state, &contract).await?)
    } else {
        None
    };
    notify(
        &state.db,
        &contract.creator_id,
        kinds::CONTRACT,
        "Contract voided",
        &format!("\"{}\" was voided", contract.title),
    )
    .await;
    Ok(Json(ContractActionResponse { contract, email }))
}

/// PUT /api/contracts/:id/pdf
pub async fn upload_pdf(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Body,
) -> ApiResult<Json<Contract>> {
    require_manager(&state, &user).await?;
    let contract = load_visible(&state, &user, &id).await?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !content_type.starts_with(PDF_CONTENT_TYPE) {
        return Err(ApiError::BadRequest(format!(
            "Content-Type must be {}",
            PDF_CONTENT_TYPE
        )));
    }

    let bytes = read_capped(body, MAX_PDF_BYTES).await?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Empty PDF".to_string()));
    }

    let key = Storage::object_key(&contract.creator_id, &format!("{}.pdf", contract.id));
    state.storage.put(Bucket::Contracts, &key, &bytes).await?;
    db::contracts::set_pdf_key(&state.db, &contract.id, &key).await?;
    if let Some(old_key) = &contract.pdf_key {
        if let Err(e) = state.storage.delete(Bucket::Contracts, old_key).await {
            warn!(contract_id = %contract.id, key = %old_key, "Failed to remove old PDF: {}", e);
        }
    }
    info!(contract_id = %contract.id, size = bytes.len(), "Contract PDF stored");

    let updated = db::contracts::get_contract(&state.db, &contract.id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Contract {}", contract.id)))?;
    Ok(Json(updated))
}

/// GET /api/contracts/:id/pdf
pub async fn download_pdf(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let contract = load_visible(&state, &user, &id).await?;
    let key = contract
        .pdf_key
        .ok_or_else(|| ApiError::NotFound(format!("PDF for contract {}", id)))?;
    let bytes = state.storage.get(Bucket::Contracts, &key).await?;
    Ok(([(header::CONTENT_TYPE, PDF_CONTENT_TYPE)], bytes))
}

/// Buffer a request body, answering 413 past `limit` bytes
pub async fn read_capped(body: Body, limit: usize) -> ApiResult<Bytes> {
    to_bytes(body, limit)
        .await
        .map_err(|_| ApiError::PayloadTooLarge(format!("Body exceeds {} bytes", limit)))
}

pub fn contract_routes() -> Router<AppState> {
    Router::new()
        .route("/api/contracts", get(list_contracts).post(create_contract))
        .route("/api/contracts/:id", get(get_contract))
        .route("/api/contracts/:id/send", post(send_contract))
        .route("/api/contracts/:id/sign", post(sign_contract))
        .route("/api/contracts/:id/void", post(void_contract))
        .route("/api/contracts/:id/pdf", get(download_pdf).put(upload_pdf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_matching() {
        assert!(signature_matches("Jane Doe", "Jane Doe"));
        assert!(signature_matches("  jane doe ", "Jane Doe"));
        assert!(!signature_matches("Jane", "Jane Doe"));
        assert!(!signature_matches("   ", ""));
    }
}
