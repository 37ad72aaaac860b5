//! Generic webhook notifier.
//!
//! POSTs `{"subject", "body", "text"}` as JSON. `text` carries subject and
//! body joined, for receivers that only render a single field.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::Notifier;
use crate::types::SendError;

pub struct WebhookNotifier {
    http: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String, timeout: Duration) -> Result<Self, SendError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SendError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, url })
    }
}

fn payload(subject: &str, body: &str) -> serde_json::Value {
    json!({
        "subject": subject,
        "body": body,
        "text": format!("{subject}\n\n{body}"),
    })
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<(), SendError> {
        debug!(subject, "Posting webhook notification");

        let resp = self
            .http
            .post(&self.url)
            .json(&payload(subject, body))
            .send()
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(SendError::Rejected { status, body });
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "webhook"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let p = payload("Subject", "Line 1\nLine 2");
        assert_eq!(p["subject"], "Subject");
        assert_eq!(p["body"], "Line 1\nLine 2");
        assert_eq!(p["text"], "Subject\n\nLine 1\nLine 2");
    }

    #[tokio::test]
    async fn test_invalid_url_is_transport_error() {
        let n = WebhookNotifier::new("not a url".into(), Duration::from_secs(1)).unwrap();
        let err = n.send("s", "b").await.unwrap_err();
        assert!(matches!(err, SendError::Transport(_)));
    }
}
