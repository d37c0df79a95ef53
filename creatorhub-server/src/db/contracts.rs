//! Creator contracts

use chrono::{DateTime, Utc};
use creatorhub_common::domain::ContractStatus;
use creatorhub_common::time;
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

/// One row of `creator_contracts`
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Contract {
    pub id: String,
    pub creator_id: String,
    pub title: String,
    pub terms: String,
    pub revenue_share_percent: i64,
    pub status: ContractStatus,
    pub pdf_key: Option<String>,
    pub signature_name: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub signed_at: Option<DateTime<Utc>>,
    pub voided_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SELECT_COLUMNS: &str = "SELECT id, creator_id, title, terms, revenue_share_percent, \
     status, pdf_key, signature_name, sent_at, signed_at, voided_at, created_by, created_at, \
     updated_at FROM creator_contracts";

pub async fn insert_contract(
    db: &SqlitePool,
    creator_id: &str,
    title: &str,
    terms: &str,
    revenue_share_percent: i64,
    created_by: Option<&str>,
) -> Result<Contract, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = time::now();
    sqlx::query(
        r#"
        INSERT INTO creator_contracts (
            id, creator_id, title, terms, revenue_share_percent, status,
            created_by, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, 'draft', ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(creator_id)
    .bind(title)
    .bind(terms)
    .bind(revenue_share_percent)
    .bind(created_by)
    .bind(now)
    .bind(now)
    .execute(db)
    .await?;

    get_contract(db, &id).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn get_contract(db: &SqlitePool, id: &str) -> Result<Option<Contract>, sqlx::Error> {
    let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);
    sqlx::query_as::<_, Contract>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Contracts for one creator, or all contracts when `creator_id` is `None`
pub async fn list_contracts(
    db: &SqlitePool,
    creator_id: Option<&str>,
) -> Result<Vec<Contract>, sqlx::Error> {
    let sql = match creator_id {
        Some(_) => format!("{} WHERE creator_id = ? ORDER BY created_at DESC", SELECT_COLUMNS),
        None => format!("{} ORDER BY created_at DESC", SELECT_COLUMNS),
    };
    let mut query = sqlx::query_as::<_, Contract>(&sql);
    if let Some(creator_id) = creator_id {
        query = query.bind(creator_id);
    }
    query.fetch_all(db).await
}

/// Move a contract from `from` to `to`, stamping the matching timestamp
///
/// Returns false when the row is no longer in `from`.
pub async fn transition(
    db: &SqlitePool,
    id: &str,
    from: ContractStatus,
    to: ContractStatus,
    signature_name: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let stamp_column = match to {
        ContractStatus::Sent => "sent_at",
        ContractStatus::Signed => "signed_at",
        ContractStatus::Voided => "voided_at",
        ContractStatus::Draft => "updated_at",
    };
    let now = time::now();
    let sql = format!(
        r#"
        UPDATE creator_contracts
        SET status = ?, {} = ?, signature_name = COALESCE(?, signature_name), updated_at = ?
        WHERE id = ? AND status = ?
        "#,
        stamp_column
    );
    let result = sqlx::query(&sql)
        .bind(to)
        .bind(now)
        .bind(signature_name)
        .bind(now)
        .bind(id)
        .bind(from)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_pdf_key(db: &SqlitePool, id: &str, key: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE creator_contracts SET pdf_key = ?, updated_at = ? WHERE id = ?")
        .bind(key)
        .bind(time::now())
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

/// Most recently signed contract of a creator
pub async fn latest_signed(
    db: &SqlitePool,
    creator_id: &str,
) -> Result<Option<Contract>, sqlx::Error> {
    let sql = format!(
        "{} WHERE creator_id = ? AND status = 'signed' ORDER BY signed_at DESC LIMIT 1",
        SELECT_COLUMNS
    );
    sqlx::query_as::<_, Contract>(&sql)
        .bind(creator_id)
        .fetch_optional(db)
        .await
}
