//! Creator invoices

use chrono::{DateTime, NaiveDate, Utc};
use creatorhub_common::domain::InvoiceStatus;
use creatorhub_common::time;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

/// One invoice line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub description: String,
    pub quantity: i64,
    pub unit_amount_cents: i64,
}

/// One row of `invoices`
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Invoice {
    pub id: String,
    pub invoice_number: String,
    pub creator_id: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub due_date: NaiveDate,
    pub items: Json<Vec<InvoiceItem>>,
    pub subtotal_cents: i64,
    pub agency_fee_cents: i64,
    pub total_cents: i64,
    pub status: InvoiceStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fully computed invoice ready for insertion
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub invoice_number: String,
    pub creator_id: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub due_date: NaiveDate,
    pub items: Vec<InvoiceItem>,
    pub subtotal_cents: i64,
    pub agency_fee_cents: i64,
    pub total_cents: i64,
}

const SELECT_COLUMNS: &str = "SELECT id, invoice_number, creator_id, period_start, period_end, \
     due_date, items, subtotal_cents, agency_fee_cents, total_cents, status, paid_at, \
     created_by, created_at, updated_at FROM invoices";

pub async fn insert_invoice(
    db: &SqlitePool,
    invoice: &NewInvoice,
    created_by: Option<&str>,
) -> Result<Invoice, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = time::now();
    sqlx::query(
        r#"
        INSERT INTO invoices (
            id, invoice_number, creator_id, period_start, period_end, due_date, items,
            subtotal_cents, agency_fee_cents, total_cents, status, created_by,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'draft', ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&invoice.invoice_number)
    .bind(&invoice.creator_id)
    .bind(invoice.period_start)
    .bind(invoice.period_end)
    .bind(invoice.due_date)
    .bind(Json(&invoice.items))
    .bind(invoice.subtotal_cents)
    .bind(invoice.agency_fee_cents)
    .bind(invoice.total_cents)
    .bind(created_by)
    .bind(now)
    .bind(now)
    .execute(db)
    .await?;

    get_invoice(db, &id).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn get_invoice(db: &SqlitePool, id: &str) -> Result<Option<Invoice>, sqlx::Error> {
    let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);
    sqlx::query_as::<_, Invoice>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Invoices filtered by creator and stored status
pub async fn list_invoices(
    db: &SqlitePool,
    creator_id: Option<&str>,
    status: Option<InvoiceStatus>,
) -> Result<Vec<Invoice>, sqlx::Error> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_COLUMNS);
    query.push(" WHERE 1 = 1");
    if let Some(creator_id) = creator_id {
        query.push(" AND creator_id = ").push_bind(creator_id.to_string());
    }
    if let Some(status) = status {
        query.push(" AND status = ").push_bind(status);
    }
    query.push(" ORDER BY created_at DESC");
    query.build_query_as::<Invoice>().fetch_all(db).await
}

/// Highest sequence number already used for an invoice number prefix
pub async fn max_sequence(db: &SqlitePool, prefix: &str) -> Result<u32, sqlx::Error> {
    let numbers: Vec<String> =
        sqlx::query_scalar("SELECT invoice_number FROM invoices WHERE invoice_number LIKE ?")
            .bind(format!("{}%", prefix))
            .fetch_all(db)
            .await?;
    Ok(numbers
        .iter()
        .filter_map(|n| n.strip_prefix(prefix))
        .filter_map(|seq| seq.parse::<u32>().ok())
        .max()
        .unwrap_or(0))
}

pub async fn set_status(
    db: &SqlitePool,
    id: &str,
    status: InvoiceStatus,
    paid_at: Option<DateTime<Utc>>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE invoices SET status = ?, paid_at = COALESCE(?, paid_at), updated_at = ? WHERE id = ?",
    )
    .bind(status)
    .bind(paid_at)
    .bind(time::now())
    .bind(id)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}
