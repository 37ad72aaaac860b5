//! SMTP email notifier.
//!
//! Sends plain-text mail through an authenticated SMTP relay. The relay is
//! named the way deployments already configure it: a well-known service
//! (`gmail`, `outlook`, `yahoo`, ...) or an SMTP host name.
//! Recipients are a comma-separated list.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message as Email, Tokio1Executor};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::debug;

use super::Notifier;
use crate::types::SendError;

/// How to reach the relay for a given service name.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Relay {
    /// Implicit TLS on port 465.
    Tls(String),
    /// STARTTLS on port 587.
    StartTls(String),
}

fn relay_for(service: &str) -> Relay {
    match service.trim().to_ascii_lowercase().as_str() {
        "gmail" | "googlemail" => Relay::Tls("smtp.gmail.com".to_string()),
        "outlook" | "hotmail" | "outlook365" | "office365" => {
            Relay::StartTls("smtp.office365.com".to_string())
        }
        "yahoo" => Relay::Tls("smtp.mail.yahoo.com".to_string()),
        "icloud" => Relay::StartTls("smtp.mail.me.com".to_string()),
        "zoho" => Relay::Tls("smtp.zoho.com".to_string()),
        _ => Relay::Tls(service.trim().to_string()),
    }
}

fn parse_recipients(list: &str) -> Result<Vec<Mailbox>, SendError> {
    let recipients = list
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|r| {
            r.parse::<Mailbox>()
                .map_err(|e| SendError::NotConfigured(format!("invalid recipient {r:?}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if recipients.is_empty() {
        return Err(SendError::NotConfigured("no email recipients".to_string()));
    }
    Ok(recipients)
}

pub struct EmailNotifier {
    relay: Relay,
    user: String,
    password: SecretString,
    from: Mailbox,
    to: Vec<Mailbox>,
    timeout: Duration,
}

impl EmailNotifier {
    /// `user` is both the SMTP login and the sender address.
    pub fn new(
        service: &str,
        user: String,
        password: String,
        recipients: &str,
        timeout: Duration,
    ) -> Result<Self, SendError> {
        if service.trim().is_empty() {
            return Err(SendError::NotConfigured("email service is empty".to_string()));
        }
        let from = user
            .trim()
            .parse::<Mailbox>()
            .map_err(|e| SendError::NotConfigured(format!("invalid sender {user:?}: {e}")))?;

        Ok(Self {
            relay: relay_for(service),
            user,
            password: SecretString::new(password),
            from,
            to: parse_recipients(recipients)?,
            timeout,
        })
    }

    fn compose(&self, subject: &str, body: &str) -> Result<Email, SendError> {
        let mut builder = Email::builder()
            .from(self.from.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);
        for to in &self.to {
            builder = builder.to(to.clone());
        }
        builder
            .body(body.to_string())
            .map_err(|e| SendError::Transport(format!("failed to build email: {e}")))
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, SendError> {
        let builder = match &self.relay {
            Relay::Tls(host) => AsyncSmtpTransport::<Tokio1Executor>::relay(host),
            Relay::StartTls(host) => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host),
        }
        .map_err(|e| SendError::Transport(format!("invalid SMTP relay: {e}")))?;

        let credentials = Credentials::new(
            self.user.clone(),
            self.password.expose_secret().clone(),
        );
        Ok(builder
            .credentials(credentials)
            .timeout(Some(self.timeout))
            .build())
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<(), SendError> {
        debug!(recipients = self.to.len(), subject, "Sending email");

        let email = self.compose(subject, body)?;
        // Negative SMTP replies surface as errors from `send`.
        self.transport()?
            .send(email)
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "email"
    }
}
