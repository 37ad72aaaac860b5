//! Notification texts.
//!
//! Plain-text subject/body pairs for every message the monitor sends:
//! content-change alerts, the first-run acknowledgment, the test message
//! and the error alert.

use chrono::{DateTime, Utc};

use crate::types::BetRecord;

/// A composed notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub body: String,
}

/// Details shared by every message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContext {
    pub site_name: String,
    pub page_url: String,
}

impl MessageContext {
    fn footer(&self, timestamp: DateTime<Utc>) -> String {
        format!(
            "View full details: {}\nTimestamp: {}",
            self.page_url,
            timestamp.to_rfc3339()
        )
    }
}

/// Alert for a changed page.
///
/// A posted tip wins over the no-basic-tips marker only when the marker is
/// absent; otherwise the marker message goes out, and a generic update
/// message covers everything else.
pub fn change_alert(ctx: &MessageContext, record: &BetRecord) -> Message {
    let mut sections = Vec::new();

    let subject = if !record.match_info().is_empty() && !record.has_no_basic_tips() {
        let mut lines = vec![
            "New Bet Suggestion Posted!".to_string(),
            String::new(),
            "Free Bet of the Day".to_string(),
            format!("Match: {}", record.match_info()),
        ];
        if !record.match_tip().is_empty() {
            lines.push(format!("Tip: {}", record.match_tip()));
        }
        if !record.match_odds().is_empty() {
            lines.push(format!("Odds: {}", record.match_odds()));
        }
        sections.push(lines.join("\n"));
        "🎯 New Bet Suggestion Available!".to_string()
    } else if record.has_no_basic_tips() {
        sections.push(
            "No Basic Tips Available Today\n\n\
             No basic tips are available today. Only premium content is posted."
                .to_string(),
        );
        format!("📊 {}: No Basic Tips Today", ctx.site_name)
    } else {
        sections.push(format!(
            "{} Content Updated\n\n\
             The betting page has been updated. Please check the website for details.",
            ctx.site_name
        ));
        format!("🎯 {} Update!", ctx.site_name)
    };

    let secondary = record.secondary_section_text();
    if !secondary.is_empty() && secondary != record.free_bet_section_text() {
        sections.push(
            "Additional Tips\nCheck the V-tab section for more betting options.".to_string(),
        );
    }

    sections.push(ctx.footer(record.captured_at()));

    Message {
        subject,
        body: sections.join("\n\n"),
    }
}

/// One-time message sent when the monitor records its first snapshot.
pub fn first_run_ack(ctx: &MessageContext, record: &BetRecord) -> Message {
    let current = if record.match_info().is_empty() {
        "No tip is posted right now.".to_string()
    } else {
        format!("Current tip: {}", record.match_info())
    };

    Message {
        subject: "✅ Bet Monitor Active".to_string(),
        body: format!(
            "Your bet monitor is running and has recorded the current state of {}.\n\
             You will receive notifications when new bets are posted.\n\n{}\n\n{}",
            ctx.site_name,
            current,
            ctx.footer(record.captured_at())
        ),
    }
}

/// Synthetic message for checking the notification channel.
pub fn test_message(ctx: &MessageContext, now: DateTime<Utc>) -> Message {
    Message {
        subject: "🧪 Bet Monitor Test Message".to_string(),
        body: format!(
            "Test Message\n\n\
             Your bet monitor notifications are working correctly!\n\
             You will receive notifications when new bets are posted.\n\n{}",
            ctx.footer(now)
        ),
    }
}

/// Alert for a run that failed before a decision could be made.
pub fn error_alert(ctx: &MessageContext, error: &str, now: DateTime<Utc>) -> Message {
    Message {
        subject: "❌ Bet Monitor Error".to_string(),
        body: format!(
            "Error in Bet Monitor\n\nError: {error}\nTime: {}\n\n\
             Please check the monitor logs for more details.\nPage: {}",
            now.to_rfc3339(),
            ctx.page_url
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
