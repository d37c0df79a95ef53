//! Log-only mailer used when no provider key is configured

use async_trait::async_trait;
use std::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use super::{MailError, Mailer, OutboundEmail};

/// Records every message in memory and logs it instead of delivering
#[derive(Default)]
pub struct LogMailer {
    sent: Mutex<Vec<OutboundEmail>>,
}

impl LogMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages "sent" so far, oldest first
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<String, MailError> {
        info!(to = %email.to, subject = %email.subject, "Email (log only)");

        let id = format!("log-{}", Uuid::new_v4());
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email.clone());
        }
        Ok(id)
    }

    fn provider(&self) -> &'static str {
        "log"
    }
}
