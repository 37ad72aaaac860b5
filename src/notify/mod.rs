//! Notification delivery.
//!
//! Defines the `Notifier` trait and provides implementations for:
//! - Email: SMTP relay with login (`EMAIL_*` variables)
//! - Telegram: Bot API `sendMessage`
//! - Webhook: JSON POST to an arbitrary URL
//! - Log: writes the message to the log only (default, no setup needed)
//!
//! Message texts are composed in `message`; notifiers only deliver.

pub mod email;
pub mod message;
pub mod telegram;
pub mod webhook;

use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

use crate::config::{AppConfig, NotifyBackend, NotifyConfig};
use crate::types::SendError;

/// Abstraction over a notification channel.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message. Single attempt, no retry.
    async fn send(&self, subject: &str, body: &str) -> Result<(), SendError>;

    /// Channel name for logging.
    fn name(&self) -> &str;
}

/// Notifier that only writes to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<(), SendError> {
        info!(subject, body, "Notification");
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Build the configured notifier, resolving its secrets from the environment.
pub fn build_notifier(config: &NotifyConfig) -> Result<Box<dyn Notifier>, SendError> {
    let timeout = Duration::from_secs(config.timeout_secs);
    match config.backend {
        NotifyBackend::Log => Ok(Box::new(LogNotifier)),
        NotifyBackend::Email => {
            let service = resolve_secret(&config.email_service_env)?;
            let user = resolve_secret(&config.email_user_env)?;
            let password = resolve_secret(&config.email_password_env)?;
            let recipients = resolve_secret(&config.email_recipients_env)?;
            Ok(Box::new(email::EmailNotifier::new(
                &service, user, password, &recipients, timeout,
            )?))
        }
        NotifyBackend::Telegram => {
            let token = resolve_secret(&config.telegram_bot_token_env)?;
            let chat_id = resolve_secret(&config.telegram_chat_id_env)?;
            Ok(Box::new(telegram::TelegramNotifier::new(token, chat_id, timeout)?))
        }
        NotifyBackend::Webhook => {
            let url = resolve_secret(&config.webhook_url_env)?;
            Ok(Box::new(webhook::WebhookNotifier::new(url, timeout)?))
        }
    }
}

fn resolve_secret(env_name: &str) -> Result<String, SendError> {
    AppConfig::resolve_env(env_name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| SendError::NotConfigured(format!("environment variable {env_name} is not set")))
}
