//! Telegram Bot API notifier.
//!
//! API: `https://api.telegram.org/bot{token}/sendMessage`
//! Auth: bot token in the URL path. Messages go out as plain text so that
//! page content never needs Markdown escaping.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::Notifier;
use crate::types::SendError;

const API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: String,
    disable_web_page_preview: bool,
}

pub struct TelegramNotifier {
    http: Client,
    token: SecretString,
    chat_id: String,
    api_base: String,
}

impl TelegramNotifier {
    pub fn new(token: String, chat_id: String, timeout: Duration) -> Result<Self, SendError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SendError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            token: SecretString::new(token),
            chat_id,
            api_base: API_BASE.to_string(),
        })
    }

    /// Point the client at a different API host (self-hosted Bot API server).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.token.expose_secret()
        )
    }

    fn payload(&self, subject: &str, body: &str) -> SendMessageRequest<'_> {
        SendMessageRequest {
            chat_id: &self.chat_id,
            text: format!("{subject}\n\n{body}"),
            disable_web_page_preview: true,
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<(), SendError> {
        debug!(chat_id = %self.chat_id, subject, "Sending Telegram message");

        let resp = self
            .http
            .post(self.endpoint())
            .json(&self.payload(subject, body))
            .send()
            .await
            // reqwest errors embed the URL, which carries the token.
            .map_err(|e| SendError::Transport(e.without_url().to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(SendError::Rejected { status, body });
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "telegram"
    }
}
