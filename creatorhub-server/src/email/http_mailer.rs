//! Transactional email API client
//!
//! Sends `POST {api_url}` with a bearer key and a JSON body
//! `{from, to: [..], subject, html, text}`; the provider answers with
//! `{"id": "..."}`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{MailError, Mailer, OutboundEmail};

/// Default timeout for provider requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest provider error body kept in logs
const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: Option<String>,
}

/// HTTP mailer
pub struct HttpMailer {
    http_client: Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(api_url: &str, api_key: &str, from: &str) -> Result<Self, MailError> {
        let http_client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| MailError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            from: from.to_string(),
        })
    }

    fn request_body<'a>(&'a self, email: &'a OutboundEmail) -> SendRequest<'a> {
        SendRequest {
            from: &self.from,
            to: [&email.to],
            subject: &email.subject,
            html: &email.html,
            text: &email.text,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<String, MailError> {
        debug!(to = %email.to, subject = %email.subject, "Sending email");

        let response = self
            .http_client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(email))
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        let parsed: SendResponse = response
            .json()
            .await
            .unwrap_or(SendResponse { id: None });

        Ok(parsed.id.unwrap_or_else(|| "unknown".to_string()))
    }

    fn provider(&self) -> &'static str {
        "http"
    }
}

/// Cut a string to at most `max` characters
fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
