//! Outbound email
//!
//! Delivery goes through the [`Mailer`] trait. [`HttpMailer`] talks to a
//! transactional email HTTP API; [`LogMailer`] is used when no API key is
//! configured and only records and logs messages. Every message sent by a
//! workflow is persisted in `email_logs` by [`send_logged`] so that failed
//! deliveries can be retried later by [`retry::retry_failed_emails`].

pub mod http_mailer;
pub mod log_mailer;
pub mod logs;
pub mod retry;
pub mod templates;

pub use http_mailer::HttpMailer;
pub use log_mailer::LogMailer;
pub use logs::{send_logged, EmailLog, EmailOutcome};
pub use retry::{retry_failed_emails, RetryReport};

use async_trait::async_trait;
use creatorhub_common::config::EmailConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// A rendered message ready for delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// What a logged email was about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailKind {
    Invitation,
    AccessGranted,
    ContractSent,
    ContractSigned,
    ContractVoided,
    ApplicationRejected,
    MeetingScheduled,
}

impl EmailKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailKind::Invitation => "invitation",
            EmailKind::AccessGranted => "access_granted",
            EmailKind::ContractSent => "contract_sent",
            EmailKind::ContractSigned => "contract_signed",
            EmailKind::ContractVoided => "contract_voided",
            EmailKind::ApplicationRejected => "application_rejected",
            EmailKind::MeetingScheduled => "meeting_scheduled",
        }
    }
}

/// Delivery failure
#[derive(Debug, Error)]
pub enum MailError {
    /// Transport-level failure (DNS, TLS, timeout)
    #[error("Email transport error: {0}")]
    Transport(String),

    /// Provider answered with a non-success status
    #[error("Email provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// Mailer could not be constructed
    #[error("Email configuration error: {0}")]
    Config(String),
}

/// Outbound email transport
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message, returning the provider's message id
    async fn send(&self, email: &OutboundEmail) -> Result<String, MailError>;

    /// Short provider name for logs and the smoke test
    fn provider(&self) -> &'static str;
}

/// Build the mailer described by the configuration
///
/// Falls back to [`LogMailer`] when no API key is configured or the HTTP
/// client cannot be built.
pub fn mailer_from_config(config: &EmailConfig) -> Arc<dyn Mailer> {
    match &config.api_key {
        Some(key) => match HttpMailer::new(&config.api_url, key, &config.from_address) {
            Ok(mailer) => {
                info!("Email delivery via {}", config.api_url);
                Arc::new(mailer)
            }
            Err(e) => {
                warn!("{}; falling back to log-only email delivery", e);
                Arc::new(LogMailer::new())
            }
        },
        None => {
            info!("No email API key configured; emails are logged, not delivered");
            Arc::new(LogMailer::new())
        }
    }
}
