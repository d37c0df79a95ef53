//! Creator invoices

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use creatorhub_common::domain::{permissions, InvoiceStatus};
use creatorhub_common::{time, Role};

use crate::api::{setting_or, CurrentUser};
use crate::db::{
    self,
    invoices::{Invoice, InvoiceItem, NewInvoice},
};
use crate::error::{ApiError, ApiResult};
use crate::services::invoices::{
    compute_totals, default_due_date, effective_status, ensure_status_change, format_number,
    number_prefix, validate_dates,
};
use crate::services::notifications::{kinds, notify};
use crate::AppState;

/// Days between period end and due date when none is given
const PAYMENT_TERMS_SETTING: &str = "invoice_payment_terms_days";
const DEFAULT_PAYMENT_TERMS_DAYS: i64 = 14;

#[derive(Debug, Deserialize)]
pub struct CreateInvoiceRequest {
    pub creator_id: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub items: Vec<InvoiceItem>,
}

#[derive(Debug, Deserialize)]
pub struct InvoiceQuery {
    pub creator_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InvoiceStatusRequest {
    pub status: InvoiceStatus,
}

fn is_manager(user: &CurrentUser) -> bool {
    user.is_admin() || user.has_role(Role::Manager)
}

/// Replace the stored status with the one clients should see
fn with_effective_status(mut invoice: Invoice, today: NaiveDate) -> Invoice {
    invoice.status = effective_status(&invoice, today);
    invoice
}

/// POST /api/invoices
///
/// Totals are computed here; the agency fee uses the share of the
/// creator's latest signed contract, or zero without one.
pub async fn create_invoice(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateInvoiceRequest>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    user.require_any(&[Role::Admin, Role::Manager])?;
    user.require_permission(&state, permissions::INVOICES_MANAGE).await?;

    if db::profiles::get_profile(&state.db, &req.creator_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("User {}", req.creator_id)));
    }

    let due_date = match req.due_date {
        Some(date) => date,
        None => {
            let terms: i64 =
                setting_or(&state, PAYMENT_TERMS_SETTING, DEFAULT_PAYMENT_TERMS_DAYS).await?;
            default_due_date(req.period_end, terms)?
        }
    };
    validate_dates(req.period_start, req.period_end, due_date)?;

    let share = db::contracts::latest_signed(&state.db, &req.creator_id)
        .await?
        .map(|c| c.revenue_share_percent)
        .unwrap_or(0);
    let totals = compute_totals(&req.items, share)?;

    let now = time::now();
    let prefix = number_prefix(now);
    let sequence = db::invoices::max_sequence(&state.db, &prefix).await? + 1;
    let invoice = db::invoices::insert_invoice(
        &state.db,
        &NewInvoice {
            invoice_number: format_number(&prefix, sequence),
            creator_id: req.creator_id,
            period_start: req.period_start,
            period_end: req.period_end,
            due_date,
            items: req.items,
            subtotal_cents: totals.subtotal_cents,
            agency_fee_cents: totals.agency_fee_cents,
            total_cents: totals.total_cents,
        },
        Some(&user.id),
    )
    .await?;

    info!(
        invoice_id = %invoice.id,
        invoice_number = %invoice.invoice_number,
        total_cents = invoice.total_cents,
        "Invoice created"
    );
    Ok((StatusCode::CREATED, Json(invoice)))
}

/// GET /api/invoices[?creator_id=&status=]
///
/// The status filter matches the effective status, so `overdue` finds
/// sent invoices past their due date.
pub async fn list_invoices(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<InvoiceQuery>,
) -> ApiResult<Json<Vec<Invoice>>> {
    let creator_filter = if is_manager(&user) {
        query.creator_id
    } else {
        Some(user.id.clone())
    };
    let wanted = query
        .status
        .as_deref()
        .map(str::parse::<InvoiceStatus>)
        .transpose()?;

    let today = time::now().date_naive();
    let invoices = db::invoices::list_invoices(&state.db, creator_filter.as_deref(), None)
        .await?
        .into_iter()
        .map(|invoice| with_effective_status(invoice, today))
        .filter(|invoice| wanted.map_or(true, |status| invoice.status == status))
        .collect();
    Ok(Json(invoices))
}

/// GET /api/invoices/:id
pub async fn get_invoice(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Invoice>> {
    let invoice = db::invoices::get_invoice(&state.db, &id)
        .await?
        .filter(|invoice| invoice.creator_id == user.id || is_manager(&user))
        .ok_or_else(|| ApiError::NotFound(format!("Invoice {}", id)))?;
    Ok(Json(with_effective_status(invoice, time::now().date_naive())))
}

/// POST /api/invoices/:id/status
pub async fn set_invoice_status(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(req): Json<InvoiceStatusRequest>,
) -> ApiResult<Json<Invoice>> {
    user.require_any(&[Role::Admin, Role::Manager])?;
    user.require_permission(&state, permissions::INVOICES_MANAGE).await?;

    let invoice = db::invoices::get_invoice(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Invoice {}", id)))?;
    ensure_status_change(invoice.status, req.status)?;

    let paid_at = (req.status == InvoiceStatus::Paid).then(time::now);
    db::invoices::set_status(&state.db, &id, req.status, paid_at).await?;
    info!(invoice_id = %id, from = %invoice.status, to = %req.status, "Invoice status changed");

    if matches!(req.status, InvoiceStatus::Sent | InvoiceStatus::Paid) {
        notify(
            &state.db,
            &invoice.creator_id,
            kinds::INVOICE,
            &format!("Invoice {} {}", invoice.invoice_number, req.status),
            &format!(
                "Invoice {} for {} to {} is now {}",
                invoice.invoice_number, invoice.period_start, invoice.period_end, req.status
            ),
        )
        .await;
    }

    let updated = db::invoices::get_invoice(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Invoice {}", id)))?;
    Ok(Json(with_effective_status(updated, time::now().date_naive())))
}

pub fn invoice_routes() -> Router<AppState> {
    Router::new()
        .route("/api/invoices", get(list_invoices).post(create_invoice))
        .route("/api/invoices/:id", get(get_invoice))
        .route("/api/invoices/:id/status", post(set_invoice_status))
}
