//! Shared types for the free-bet monitor.
//!
//! These types form the data model used across all modules: the extracted
//! `BetRecord`, the persisted `StoredState`, and the error taxonomy of the
//! collaborators. They are kept free of I/O so extraction, fingerprinting,
//! and change detection can depend on them without cycles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::fingerprint::{self, Fingerprint};

// ---------------------------------------------------------------------------
// Extracted content
// ---------------------------------------------------------------------------

/// Raw fields pulled out of the page before derivation.
///
/// This is the extractor's working set. It becomes a `BetRecord` through
/// `BetRecord::new`, which derives `match_info` and the fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BetContent {
    pub free_bet_section_text: String,
    pub match_names: String,
    pub match_tip: String,
    pub match_odds: String,
    pub has_no_basic_tips: bool,
    pub secondary_section_text: String,
    pub raw_sections_html: String,
}

// ---------------------------------------------------------------------------
// BetRecord
// ---------------------------------------------------------------------------

/// Canonical snapshot of the promotion page at one point in time.
///
/// Fields are private: `match_info` and `fingerprint` are derived at
/// construction, so they can never drift from the fields they summarise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BetRecord {
    free_bet_section_text: String,
    match_names: String,
    match_tip: String,
    match_odds: String,
    match_info: String,
    has_no_basic_tips: bool,
    secondary_section_text: String,
    raw_sections_html: String,
    captured_at: DateTime<Utc>,
    fingerprint: Fingerprint,
}

impl BetRecord {
    pub fn new(content: BetContent, captured_at: DateTime<Utc>) -> Self {
        let match_info =
            derive_match_info(&content.match_names, &content.match_tip, &content.match_odds);
        let fingerprint = fingerprint::digest(
            &content.free_bet_section_text,
            &content.secondary_section_text,
            content.has_no_basic_tips,
        );

        Self {
            free_bet_section_text: content.free_bet_section_text,
            match_names: content.match_names,
            match_tip: content.match_tip,
            match_odds: content.match_odds,
            match_info,
            has_no_basic_tips: content.has_no_basic_tips,
            secondary_section_text: content.secondary_section_text,
            raw_sections_html: content.raw_sections_html,
            captured_at,
            fingerprint,
        }
    }

    pub fn free_bet_section_text(&self) -> &str {
        &self.free_bet_section_text
    }

    pub fn match_names(&self) -> &str {
        &self.match_names
    }

    pub fn match_tip(&self) -> &str {
        &self.match_tip
    }

    pub fn match_odds(&self) -> &str {
        &self.match_odds
    }

    /// `"{names} - {tip} ({odds})"`, or empty when names or tip is missing.
    pub fn match_info(&self) -> &str {
        &self.match_info
    }

    pub fn has_no_basic_tips(&self) -> bool {
        self.has_no_basic_tips
    }

    pub fn secondary_section_text(&self) -> &str {
        &self.secondary_section_text
    }

    /// Inner markup of the tabs container. Diagnostics only.
    pub fn raw_sections_html(&self) -> &str {
        &self.raw_sections_html
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Whether the free-bet section was found with any text in it.
    pub fn has_free_bet_section(&self) -> bool {
        !self.free_bet_section_text.is_empty()
    }
}

impl fmt::Display for BetRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let info = if self.match_info.is_empty() {
            "no match info"
        } else {
            self.match_info.as_str()
        };
        write!(
            f,
            "[{}] {} (no basic tips: {})",
            self.fingerprint, info, self.has_no_basic_tips
        )
    }
}

/// Build the display string for a tip.
///
/// Empty unless both `names` and `tip` are present; the odds suffix is
/// dropped when `odds` is empty.
pub fn derive_match_info(names: &str, tip: &str, odds: &str) -> String {
    if names.is_empty() || tip.is_empty() {
        return String::new();
    }
    if odds.is_empty() {
        format!("{names} - {tip}")
    } else {
        format!("{names} - {tip} ({odds})")
    }
}

// ---------------------------------------------------------------------------
// StoredState
// ---------------------------------------------------------------------------

/// The last persisted snapshot, as owned by a record store.
///
/// Serialized with camelCase keys; this is also the on-disk format of the
/// JSON fallback store. Every field is defaulted so that partial or legacy
/// documents still load; a document without a hash counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredState {
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub match_names: String,
    #[serde(default)]
    pub match_info: String,
    #[serde(default)]
    pub match_tip: String,
    #[serde(default)]
    pub match_odds: String,
    #[serde(default)]
    pub free_bet_content: String,
    #[serde(default)]
    pub has_no_basic_tips: bool,
    #[serde(default)]
    pub v_tab_content: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub full_html: Option<String>,
}

impl StoredState {
    /// The stored fingerprint, or `None` when the document carries no hash.
    pub fn fingerprint(&self) -> Option<Fingerprint> {
        Fingerprint::from_stored(&self.hash)
    }
}

impl From<&BetRecord> for StoredState {
    fn from(record: &BetRecord) -> Self {
        Self {
            hash: record.fingerprint().to_string(),
            match_names: record.match_names().to_string(),
            match_info: record.match_info().to_string(),
            match_tip: record.match_tip().to_string(),
            match_odds: record.match_odds().to_string(),
            free_bet_content: record.free_bet_section_text().to_string(),
            has_no_basic_tips: record.has_no_basic_tips(),
            v_tab_content: record.secondary_section_text().to_string(),
            timestamp: Some(record.captured_at()),
            full_html: Some(record.raw_sections_html().to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// The page could not be retrieved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("Request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to read body from {url}: {message}")]
    Body { url: String, message: String },
}

/// The fetched markup could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("Document is empty")]
    EmptyDocument,

    #[error("Invalid selector {selector:?}: {message}")]
    Selector { selector: String, message: String },

    #[error("Invalid label pattern {pattern:?}: {message}")]
    Pattern { pattern: String, message: String },
}

/// Persistence is unavailable or a read/write failed.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Record store unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A notification could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("Notifier not configured: {0}")]
    NotConfigured(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Rejected by remote (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Configuration failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(String),

    #[error("Invalid setting {key}: {message}")]
    Invalid { key: String, message: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn content() -> BetContent {
        BetContent {
            free_bet_section_text: "Team A vs Team B Match Tip: Team A to win".into(),
            match_names: "Team A vs Team B".into(),
            match_tip: "Team A to win".into(),
            match_odds: "1.85".into(),
            has_no_basic_tips: false,
            secondary_section_text: "V tab".into(),
            raw_sections_html: "<div>raw</div>".into(),
        }
    }

    #[test]
    fn test_match_info_with_odds() {
        assert_eq!(
            derive_match_info("Team A vs Team B", "Team A to win", "1.85"),
            "Team A vs Team B - Team A to win (1.85)"
        );
    }

    #[test]
    fn test_match_info_without_odds() {
        assert_eq!(
            derive_match_info("Team A vs Team B", "Team A to win", ""),
            "Team A vs Team B - Team A to win"
        );
    }

    #[test]
    fn test_match_info_requires_names_and_tip() {
        assert_eq!(derive_match_info("", "Team A to win", "1.85"), "");
        assert_eq!(derive_match_info("Team A vs Team B", "", "1.85"), "");
    }

    #[test]
    fn test_record_derives_info_and_fingerprint() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let record = BetRecord::new(content(), at);
        assert_eq!(record.match_info(), "Team A vs Team B - Team A to win (1.85)");
        assert_eq!(record.fingerprint(), &fingerprint::of(&record));
        assert_eq!(record.captured_at(), at);
        assert!(record.has_free_bet_section());
    }

    #[test]
    fn test_stored_state_from_record() {
        let record = BetRecord::new(content(), Utc::now());
        let stored = StoredState::from(&record);
        assert_eq!(stored.hash, record.fingerprint().as_str());
        assert_eq!(stored.free_bet_content, record.free_bet_section_text());
        assert_eq!(stored.v_tab_content, "V tab");
        assert_eq!(stored.fingerprint().as_ref(), Some(record.fingerprint()));
    }

    #[test]
    fn test_stored_state_camel_case_keys() {
        let record = BetRecord::new(content(), Utc::now());
        let json = serde_json::to_value(StoredState::from(&record)).unwrap();
        assert!(json.get("hash").is_some());
        assert!(json.get("freeBetContent").is_some());
        assert!(json.get("vTabContent").is_some());
        assert_eq!(json["hasNoBasicTips"], serde_json::Value::Bool(false));
    }

    #[test]
    fn test_stored_state_without_hash_has_no_fingerprint() {
        let stored: StoredState = serde_json::from_str("{}").unwrap();
        assert!(stored.fingerprint().is_none());
    }

    #[test]
    fn test_error_display() {
        let e = FetchError::Status { url: "https://x.test".into(), status: 503 };
        assert_eq!(e.to_string(), "https://x.test returned HTTP 503");
        let e = SendError::Rejected { status: 400, body: "bad".into() };
        assert_eq!(e.to_string(), "Rejected by remote (HTTP 400): bad");
    }
}
