//! Support tickets

use chrono::{DateTime, Utc};
use creatorhub_common::domain::{TicketPriority, TicketStatus};
use creatorhub_common::time;
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

/// One row of `support_tickets`
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Ticket {
    pub id: String,
    pub user_id: String,
    pub subject: String,
    pub body: String,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const TICKET_COLUMNS: &str = "SELECT id, user_id, subject, body, priority, status, created_at, \
     updated_at FROM support_tickets";

pub async fn insert_ticket(
    db: &SqlitePool,
    user_id: &str,
    subject: &str,
    body: &str,
    priority: TicketPriority,
) -> Result<Ticket, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = time::now();
    sqlx::query(
        r#"
        INSERT INTO support_tickets (id, user_id, subject, body, priority, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, 'open', ?, ?)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(subject)
    .bind(body)
    .bind(priority)
    .bind(now)
    .bind(now)
    .execute(db)
    .await?;

    get_ticket(db, &id).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn get_ticket(db: &SqlitePool, id: &str) -> Result<Option<Ticket>, sqlx::Error> {
    let sql = format!("{} WHERE id = ?", TICKET_COLUMNS);
    sqlx::query_as::<_, Ticket>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Tickets of one user, or every ticket when `user_id` is `None`
pub async fn list_tickets(
    db: &SqlitePool,
    user_id: Option<&str>,
) -> Result<Vec<Ticket>, sqlx::Error> {
    let sql = match user_id {
        Some(_) => format!("{} WHERE user_id = ? ORDER BY created_at DESC", TICKET_COLUMNS),
        None => format!("{} ORDER BY created_at DESC", TICKET_COLUMNS),
    };
    let mut query = sqlx::query_as::<_, Ticket>(&sql);
    if let Some(user_id) = user_id {
        query = query.bind(user_id);
    }
    query.fetch_all(db).await
}

pub async fn set_ticket_status(
    db: &SqlitePool,
    id: &str,
    status: TicketStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE support_tickets SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(time::now())
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}
