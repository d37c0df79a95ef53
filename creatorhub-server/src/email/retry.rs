//! Failed email retry job
//!
//! Picks up to `batch_size` rows with `status = 'failed'` and
//! `retry_count < max_retries`. A row is re-sent only once
//! `5 min * 2^retry_count` has elapsed since its last attempt. Every retry
//! increments `retry_count` and overwrites the status fields; a single run
//! is not coordinated with other runs.

use chrono::{DateTime, Utc};
use creatorhub_common::time::is_due;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use super::logs::{record_failure, record_success, retry_candidates};
use super::Mailer;

/// Summary of one retry run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetryReport {
    /// Candidate rows loaded
    pub examined: u32,
    /// Rows re-sent this run
    pub retried: u32,
    pub succeeded: u32,
    pub failed: u32,
    /// Rows whose backoff delay has not elapsed yet
    pub skipped_not_due: u32,
    /// Rows that used up their last retry this run
    pub exhausted: u32,
}

/// Run the retry job once
pub async fn retry_failed_emails(
    db: &SqlitePool,
    mailer: &dyn Mailer,
    batch_size: u32,
    now: DateTime<Utc>,
) -> Result<RetryReport, sqlx::Error> {
    let candidates = retry_candidates(db, batch_size).await?;
    let mut report = RetryReport {
        examined: candidates.len() as u32,
        ..Default::default()
    };

    for log in candidates {
        let retry_count = u32::try_from(log.retry_count).unwrap_or(u32::MAX);
        let last_attempt = log.last_attempt_at.unwrap_or(log.created_at);

        if !is_due(last_attempt, retry_count, now) {
            report.skipped_not_due += 1;
            continue;
        }

        report.retried += 1;
        match mailer.send(&log.to_outbound()).await {
            Ok(provider_id) => {
                report.succeeded += 1;
                record_success(db, &log.id, &provider_id, now, true).await?;
                info!(log_id = %log.id, attempt = retry_count + 1, "Email retry succeeded");
            }
            Err(e) => {
                report.failed += 1;
                record_failure(db, &log.id, &e.to_string(), now, true).await?;
                if log.retry_count + 1 >= log.max_retries {
                    report.exhausted += 1;
                    warn!(log_id = %log.id, "Email retries exhausted: {}", e);
                } else {
                    warn!(log_id = %log.id, attempt = retry_count + 1, "Email retry failed: {}", e);
                }
            }
        }
    }

    if report.examined > 0 {
        info!(
            examined = report.examined,
            retried = report.retried,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped_not_due = report.skipped_not_due,
            exhausted = report.exhausted,
            "Email retry run finished"
        );
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::logs::{get_log, insert_log};
    use crate::email::{EmailKind, LogMailer, MailError, OutboundEmail};
    use async_trait::async_trait;
    use chrono::Duration;
    use creatorhub_common::db::init_memory_database;
    use creatorhub_common::domain::EmailStatus;

    struct AlwaysFails;

    #[async_trait]
    impl Mailer for AlwaysFails {
        async fn send(&self, _email: &OutboundEmail) -> Result<String, MailError> {
            Err(MailError::Rejected {
                status: 503,
                body: "unavailable".to_string(),
            })
        }

        fn provider(&self) -> &'static str {
            "failing"
        }
    }

    fn email() -> OutboundEmail {
        OutboundEmail {
            to: "jane@example.com".to_string(),
            subject: "Hello".to_string(),
            html: "<p>Hi</p>".to_string(),
            text: "Hi".to_string(),
        }
    }

    async fn failed_row(db: &SqlitePool, retry_count: i64, last_attempt: DateTime<Utc>) -> String {
        let id = insert_log(db, None, EmailKind::Invitation, &email(), 3)
            .await
            .unwrap();
        sqlx::query(
            "UPDATE email_logs SET status = 'failed', retry_count = ?, last_attempt_at = ? WHERE id = ?",
        )
        .bind(retry_count)
        .bind(last_attempt)
        .bind(&id)
        .execute(db)
        .await
        .unwrap();
        id
    }

    #[tokio::test]
    async fn test_due_row_is_resent() {
        let db = init_memory_database().await.unwrap();
        let now = creatorhub_common::time::now();
        let id = failed_row(&db, 0, now - Duration::minutes(6)).await;

        let mailer = LogMailer::new();
        let report = retry_failed_emails(&db, &mailer, 50, now).await.unwrap();

        assert_eq!(report.examined, 1);
        assert_eq!(report.retried, 1);
        assert_eq!(report.succeeded, 1);
        assert_eq!(mailer.sent().len(), 1);

        let log = get_log(&db, &id).await.unwrap().unwrap();
        assert_eq!(log.status, EmailStatus::Sent);
        assert_eq!(log.retry_count, 1);
        assert!(log.sent_at.is_some());
    }

    #[tokio::test]
    async fn test_backoff_not_elapsed_is_skipped() {
        let db = init_memory_database().await.unwrap();
        let now = creatorhub_common::time::now();
        // retry_count 2 needs 20 minutes
        failed_row(&db, 2, now - Duration::minutes(19)).await;

        let mailer = LogMailer::new();
        let report = retry_failed_emails(&db, &mailer, 50, now).await.unwrap();

        assert_eq!(report.skipped_not_due, 1);
        assert_eq!(report.retried, 0);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_failure_increments_and_exhausts() {
        let db = init_memory_database().await.unwrap();
        let now = creatorhub_common::time::now();
        let id = failed_row(&db, 2, now - Duration::hours(1)).await;

        let report = retry_failed_emails(&db, &AlwaysFails, 50, now).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.exhausted, 1);

        let log = get_log(&db, &id).await.unwrap().unwrap();
        assert_eq!(log.status, EmailStatus::Failed);
        assert_eq!(log.retry_count, 3);
        assert!(log.last_error.unwrap().contains("503"));

        // No longer a candidate
        let report = retry_failed_emails(&db, &LogMailer::new(), 50, now + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(report.examined, 0);
    }

    #[tokio::test]
    async fn test_sent_rows_are_ignored_and_batch_is_capped() {
        let db = init_memory_database().await.unwrap();
        let now = creatorhub_common::time::now();
        for _ in 0..5 {
            failed_row(&db, 0, now - Duration::hours(1)).await;
        }
        insert_log(&db, None, EmailKind::Invitation, &email(), 3)
            .await
            .unwrap();

        let report = retry_failed_emails(&db, &LogMailer::new(), 3, now).await.unwrap();
        assert_eq!(report.examined, 3);
        assert_eq!(report.succeeded, 3);
    }
}
