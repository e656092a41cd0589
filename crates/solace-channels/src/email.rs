//! Transactional email delivery over a Resend-compatible HTTP API.
//!
//! Docs: <https://resend.com/docs/api-reference/emails/send-email>

use async_trait::async_trait;
use serde::Serialize;
use solace_core::{error::SolaceError, traits::Mailer};
use tracing::{debug, warn};

/// Email channel using a Resend-compatible `/emails` endpoint.
pub struct HttpMailer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    from_address: String,
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

impl HttpMailer {
    /// Create from config values.
    pub fn from_config(base_url: String, api_key: String, from_address: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            from_address,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    fn name(&self) -> &str {
        "email"
    }

    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), SolaceError> {
        if self.api_key.is_empty() {
            warn!("email: no API key configured, dropping message to {to}");
            return Err(SolaceError::Mail("no API key configured".to_string()));
        }

        let body = SendEmailRequest {
            from: &self.from_address,
            to: [to],
            subject,
            html,
        };

        let url = format!("{}/emails", self.base_url.trim_end_matches('/'));
        debug!("email: POST {url} to={to} subject={subject}");

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| SolaceError::Mail(format!("email request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(SolaceError::Mail(format!("email returned {status}: {text}")));
        }

        Ok(())
    }
}
