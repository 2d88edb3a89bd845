// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outbound notification delivery.

use crate::config::MailConfig;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::Mutex;

const SEND_URL: &str = "https://send.api.mailtrap.io/api/send";
const FROM_NAME: &str = "SocialAPI";
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_secs(1);
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Message templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    /// Invitation carrying the activation link
    UserInvitation,
}

/// Values substituted into a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateData {
    pub username: String,
    pub activation_url: String,
}

impl Template {
    pub fn name(self) -> &'static str {
        match self {
            Template::UserInvitation => "user_invitation",
        }
    }

    /// Render `(subject, html_body)`.
    pub fn render(self, data: &TemplateData) -> (String, String) {
        match self {
            Template::UserInvitation => (
                format!("Finish registration with {}", FROM_NAME),
                format!(
                    "<p>Hi {},</p>\
                     <p>Thanks for signing up for {}. Confirm your email to activate your account:</p>\
                     <p><a href=\"{}\">{}</a></p>\
                     <p>If you did not sign up, you can safely ignore this email.</p>",
                    data.username, FROM_NAME, data.activation_url, data.activation_url
                ),
            ),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail request failed: {0}")]
    Transport(String),

    #[error("mail API returned HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Notification channel. Returns the provider's HTTP status on success.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        template: Template,
        display_name: &str,
        address: &str,
        data: &TemplateData,
    ) -> Result<u16, MailError>;
}

// ─── Mailtrap ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: Address<'a>,
    to: [Address<'a>; 1],
    subject: &'a str,
    html: &'a str,
    category: &'a str,
}

/// Mailtrap HTTP send API client.
#[derive(Clone)]
pub struct MailtrapMailer {
    http: reqwest::Client,
    api_key: String,
    from_email: String,
}

impl MailtrapMailer {
    pub fn new(config: &MailConfig) -> anyhow::Result<Self> {
        if config.api_key.is_empty() {
            anyhow::bail!("Mailtrap API key is required");
        }

        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            from_email: config.from_email.clone(),
        })
    }

    async fn send_once(&self, request: &SendRequest<'_>) -> Result<u16, MailError> {
        let response = self
            .http
            .post(SEND_URL)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(status.as_u16());
        }

        let body = response.text().await.unwrap_or_default();
        Err(MailError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Mailer for MailtrapMailer {
    async fn send(
        &self,
        template: Template,
        display_name: &str,
        address: &str,
        data: &TemplateData,
    ) -> Result<u16, MailError> {
        let (subject, html) = template.render(data);
        let request = SendRequest {
            from: Address {
                email: &self.from_email,
                name: FROM_NAME,
            },
            to: [Address {
                email: address,
                name: display_name,
            }],
            subject: &subject,
            html: &html,
            category: template.name(),
        };

        let mut attempt = 1;
        loop {
            match self.send_once(&request).await {
                Ok(status) => {
                    tracing::info!(template = template.name(), status, attempt, "Mail sent");
                    return Ok(status);
                }
                Err(e) if attempt < MAX_ATTEMPTS => {
                    tracing::warn!(
                        template = template.name(),
                        attempt,
                        error = %e,
                        "Mail send failed, retrying"
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// ─── In-memory ──────────────────────────────────────────────────────────────

/// A message captured by [`MemoryMailer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub template: Template,
    pub display_name: String,
    pub address: String,
    pub data: TemplateData,
}

/// Records messages instead of sending them.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<SentMail>>,
    failing: std::sync::atomic::AtomicBool,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent send fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing
            .store(failing, std::sync::atomic::Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(
        &self,
        template: Template,
        display_name: &str,
        address: &str,
        data: &TemplateData,
    ) -> Result<u16, MailError> {
        if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(MailError::Transport("mailer set to fail".to_string()));
        }

        self.sent.lock().await.push(SentMail {
            template,
            display_name: display_name.to_string(),
            address: address.to_string(),
            data: data.clone(),
        });
        Ok(200)
    }
}
