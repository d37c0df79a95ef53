//! Demo data for staging environments

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use creatorhub_common::{time, AccessLevel, Role};

use crate::api::CurrentUser;
use crate::db;
use crate::db::applications::NewApplication;
use crate::db::invoices::{InvoiceItem, NewInvoice};
use crate::error::ApiResult;
use crate::services::invoices::{compute_totals, format_number, number_prefix};
use crate::AppState;

const DEMO_SHARE_PERCENT: i64 = 30;

#[derive(Debug, Clone, Serialize)]
pub struct TestDataReport {
    pub creator_id: String,
    pub creator_email: String,
    pub application_id: String,
    pub slot_ids: Vec<String>,
    pub contract_id: String,
    pub invoice_id: String,
}

/// Create a demo creator with an application, slots, a contract and an invoice
///
/// Profiles are flagged `is_test_data`. Slots belong to the caller.
pub async fn create_test_data(state: &AppState, actor: &CurrentUser) -> ApiResult<TestDataReport> {
    let suffix = &Uuid::new_v4().simple().to_string()[..8];
    let email = format!("demo.creator.{}@example.com", suffix);
    let name = format!("Demo Creator {}", suffix);

    let application = db::applications::insert_application(
        &state.db,
        &NewApplication {
            full_name: name.clone(),
            email: email.clone(),
            stage_name: Some(format!("demo_{}", suffix)),
            instagram_handle: Some(format!("@demo_{}", suffix)),
            follower_count: Some(12_500),
            message: Some("Generated test data".to_string()),
            ..Default::default()
        },
    )
    .await?;

    let creator_id = db::profiles::insert_profile(&state.db, &email, &name, true).await?;
    db::profiles::grant_role(&state.db, &creator_id, Role::Creator, Some(&actor.id)).await?;
    db::applications::mark_approved(&state.db, &application.id, &creator_id, &actor.id).await?;
    db::access::upsert_level(&state.db, &creator_id, AccessLevel::FullAccess, Some(&actor.id))
        .await?;
    db::access::insert_audit(
        &state.db,
        &creator_id,
        None,
        AccessLevel::FullAccess,
        Some(&actor.id),
        Some("Test data"),
    )
    .await?;

    let tomorrow = (time::now() + Duration::days(1)).date_naive();
    let mut slot_ids = Vec::new();
    for hour in [10, 14] {
        let start = tomorrow
            .and_hms_opt(hour, 0, 0)
            .map(|t| t.and_utc())
            .unwrap_or_else(Utc::now);
        let slot =
            db::scheduling::insert_slot(&state.db, &actor.id, start, start + Duration::minutes(30))
                .await?;
        slot_ids.push(slot.id);
    }

    let contract = db::contracts::insert_contract(
        &state.db,
        &creator_id,
        "Demo management agreement",
        "Demo terms. Not legally binding.",
        DEMO_SHARE_PERCENT,
        Some(&actor.id),
    )
    .await?;

    let items = vec![InvoiceItem {
        description: "Demo subscription revenue".to_string(),
        quantity: 1,
        unit_amount_cents: 250_000,
    }];
    let totals = compute_totals(&items, DEMO_SHARE_PERCENT)?;
    let today = time::now().date_naive();
    let prefix = number_prefix(time::now());
    let sequence = db::invoices::max_sequence(&state.db, &prefix).await? + 1;
    let invoice = db::invoices::insert_invoice(
        &state.db,
        &NewInvoice {
            invoice_number: format_number(&prefix, sequence),
            creator_id: creator_id.clone(),
            period_start: today - Duration::days(30),
            period_end: today,
            due_date: today + Duration::days(14),
            items,
            subtotal_cents: totals.subtotal_cents,
            agency_fee_cents: totals.agency_fee_cents,
            total_cents: totals.total_cents,
        },
        Some(&actor.id),
    )
    .await?;

    info!(creator_id = %creator_id, created_by = %actor.id, "Test data created");
    Ok(TestDataReport {
        creator_id,
        creator_email: email,
        application_id: application.id,
        slot_ids,
        contract_id: contract.id,
        invoice_id: invoice.id,
    })
}
