//! `email_logs` persistence and logged delivery

use chrono::{DateTime, Utc};
use creatorhub_common::domain::EmailStatus;
use creatorhub_common::time;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use super::{EmailKind, Mailer, OutboundEmail};

/// One row of `email_logs`
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EmailLog {
    pub id: String,
    pub user_id: Option<String>,
    pub kind: String,
    pub recipient: String,
    pub subject: String,
    #[serde(skip)]
    pub html_body: String,
    #[serde(skip)]
    pub text_body: String,
    pub status: EmailStatus,
    pub retry_count: i64,
    pub max_retries: i64,
    pub last_error: Option<String>,
    pub provider_message_id: Option<String>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl EmailLog {
    /// Rebuild the message for another delivery attempt
    pub fn to_outbound(&self) -> OutboundEmail {
        OutboundEmail {
            to: self.recipient.clone(),
            subject: self.subject.clone(),
            html: self.html_body.clone(),
            text: self.text_body.clone(),
        }
    }
}

/// Result of a logged send; delivery failures are reported, never raised
#[derive(Debug, Clone, Serialize)]
pub struct EmailOutcome {
    pub log_id: Option<String>,
    pub delivered: bool,
    pub error: Option<String>,
}

const SELECT_COLUMNS: &str = "SELECT id, user_id, kind, recipient, subject, html_body, text_body, \
     status, retry_count, max_retries, last_error, provider_message_id, last_attempt_at, \
     sent_at, created_at FROM email_logs";

/// Insert a pending log row
pub async fn insert_log(
    db: &SqlitePool,
    user_id: Option<&str>,
    kind: EmailKind,
    email: &OutboundEmail,
    max_retries: u32,
) -> Result<String, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO email_logs (
            id, user_id, kind, recipient, subject, html_body, text_body,
            status, retry_count, max_retries, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, 'pending', 0, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(kind.as_str())
    .bind(&email.to)
    .bind(&email.subject)
    .bind(&email.html)
    .bind(&email.text)
    .bind(max_retries as i64)
    .bind(time::now())
    .execute(db)
    .await?;
    Ok(id)
}

/// Mark a row delivered
///
/// `count_attempt` increments `retry_count` (used by the retry job).
pub async fn record_success(
    db: &SqlitePool,
    id: &str,
    provider_message_id: &str,
    at: DateTime<Utc>,
    count_attempt: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE email_logs
        SET status = 'sent', provider_message_id = ?, last_error = NULL,
            last_attempt_at = ?, sent_at = ?, retry_count = retry_count + ?
        WHERE id = ?
        "#,
    )
    .bind(provider_message_id)
    .bind(at)
    .bind(at)
    .bind(if count_attempt { 1i64 } else { 0 })
    .bind(id)
    .execute(db)
    .await?;
    Ok(())
}

/// Mark a row failed
pub async fn record_failure(
    db: &SqlitePool,
    id: &str,
    error: &str,
    at: DateTime<Utc>,
    count_attempt: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE email_logs
        SET status = 'failed', last_error = ?, last_attempt_at = ?,
            retry_count = retry_count + ?
        WHERE id = ?
        "#,
    )
    .bind(error)
    .bind(at)
    .bind(if count_attempt { 1i64 } else { 0 })
    .bind(id)
    .execute(db)
    .await?;
    Ok(())
}

/// Failed rows that still have retries left, oldest first
pub async fn retry_candidates(db: &SqlitePool, limit: u32) -> Result<Vec<EmailLog>, sqlx::Error> {
    let sql = format!(
        "{} WHERE status = 'failed' AND retry_count < max_retries ORDER BY created_at ASC LIMIT ?",
        SELECT_COLUMNS
    );
    sqlx::query_as::<_, EmailLog>(&sql)
        .bind(limit as i64)
        .fetch_all(db)
        .await
}

/// Recent log rows, newest first
pub async fn list_logs(
    db: &SqlitePool,
    status: Option<EmailStatus>,
    limit: u32,
) -> Result<Vec<EmailLog>, sqlx::Error> {
    let sql = match status {
        Some(_) => format!("{} WHERE status = ? ORDER BY created_at DESC LIMIT ?", SELECT_COLUMNS),
        None => format!("{} ORDER BY created_at DESC LIMIT ?", SELECT_COLUMNS),
    };
    let mut query = sqlx::query_as::<_, EmailLog>(&sql);
    if let Some(status) = status {
        query = query.bind(status);
    }
    query.bind(limit as i64).fetch_all(db).await
}

pub async fn get_log(db: &SqlitePool, id: &str) -> Result<Option<EmailLog>, sqlx::Error> {
    let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);
    sqlx::query_as::<_, EmailLog>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Log, send and record the outcome of one workflow email
///
/// Never fails: database and delivery problems are logged as warnings and
/// reported in the outcome so the calling workflow can carry on.
pub async fn send_logged(
    db: &SqlitePool,
    mailer: &dyn Mailer,
    max_retries: u32,
    user_id: Option<&str>,
    kind: EmailKind,
    email: &OutboundEmail,
) -> EmailOutcome {
    let log_id = match insert_log(db, user_id, kind, email, max_retries).await {
        Ok(id) => Some(id),
        Err(e) => {
            warn!(kind = kind.as_str(), "Failed to write email log: {}", e);
            None
        }
    };

    let now = time::now();
    match mailer.send(email).await {
        Ok(provider_id) => {
            info!(kind = kind.as_str(), to = %email.to, "Email sent");
            if let Some(id) = &log_id {
                if let Err(e) = record_success(db, id, &provider_id, now, false).await {
                    warn!(log_id = %id, "Failed to record email success: {}", e);
                }
            }
            EmailOutcome {
                log_id,
                delivered: true,
                error: None,
            }
        }
        Err(e) => {
            let message = e.to_string();
            warn!(kind = kind.as_str(), to = %email.to, "Email delivery failed: {}", message);
            if let Some(id) = &log_id {
                if let Err(e) = record_failure(db, id, &message, now, false).await {
                    warn!(log_id = %id, "Failed to record email failure: {}", e);
                }
            }
            EmailOutcome {
                log_id,
                delivered: false,
                error: Some(message),
            }
        }
    }
}
