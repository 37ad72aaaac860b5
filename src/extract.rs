//! Page extraction.
//!
//! Turns the fetched markup of the promotion page into a `BetRecord`.
//! The rules target one fixed layout: a tabbed container holding the
//! "free bet of the day" tab, an "other markets" tab and a "V" tab.
//!
//! A missing section is not an error. It yields empty fields, which is a
//! meaningful state that fingerprints and compares like any other.

use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use tracing::debug;

use crate::types::{BetContent, BetRecord, ExtractionError};

/// Marker in the other-markets tab meaning no free tips are posted today.
pub const NO_BASIC_TIPS_MARKER: &str = "(No Basic Tips)";

/// Selector for the bold element holding the match names.
const MATCH_NAMES_SELECTOR: &str = "b, strong";

/// Tip runs from its label up to the odds label, a newline, or end of text.
const TIP_PATTERN: &str = r"(?i)Match Tip:\s*([\s\S]*?)(?:Match Odds:|\n|$)";

/// Odds run from their label up to the tip label, a newline, or end of text.
const ODDS_PATTERN: &str = r"(?i)Match Odds:\s*([\s\S]*?)(?:Match Tip:|\n|$)";

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// CSS selectors locating the sections of the page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PageLayout {
    pub free_bet_tab: String,
    pub other_markets_tab: String,
    pub v_tab: String,
    pub tabs_container: String,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            free_bet_tab: "#free-bet-of-the-day-tab".to_string(),
            other_markets_tab: "#other-markets-tab".to_string(),
            v_tab: "#V-tab".to_string(),
            tabs_container: ".eael-tabs-content".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Compiled extraction rules. Build once, reuse for every run.
#[derive(Debug)]
pub struct Extractor {
    free_bet_tab: Selector,
    other_markets_tab: Selector,
    v_tab: Selector,
    tabs_container: Selector,
    match_names: Selector,
    tip: Regex,
    odds: Regex,
}

impl Extractor {
    pub fn new(layout: &PageLayout) -> Result<Self, ExtractionError> {
        Ok(Self {
            free_bet_tab: selector(&layout.free_bet_tab)?,
            other_markets_tab: selector(&layout.other_markets_tab)?,
            v_tab: selector(&layout.v_tab)?,
            tabs_container: selector(&layout.tabs_container)?,
            match_names: selector(MATCH_NAMES_SELECTOR)?,
            tip: pattern(TIP_PATTERN)?,
            odds: pattern(ODDS_PATTERN)?,
        })
    }

    /// Extract a record stamped with the current time.
    pub fn extract(&self, markup: &str) -> Result<BetRecord, ExtractionError> {
        self.extract_at(markup, Utc::now())
    }

    /// Extract a record with an explicit capture time.
    ///
    /// Identical markup always yields an identical record for the same
    /// `captured_at`.
    pub fn extract_at(
        &self,
        markup: &str,
        captured_at: DateTime<Utc>,
    ) -> Result<BetRecord, ExtractionError> {
        if markup.trim().is_empty() {
            return Err(ExtractionError::EmptyDocument);
        }

        let document = Html::parse_document(markup);
        let mut content = BetContent::default();

        let free_bet_tab = document.select(&self.free_bet_tab).next();
        if let Some(tab) = free_bet_tab {
            content.free_bet_section_text = element_text(&tab).trim().to_string();
        }

        if let Some(tab) = free_bet_tab.filter(|_| !content.free_bet_section_text.is_empty()) {
            content.match_names = tab
                .select(&self.match_names)
                .next()
                .map(|b| element_text(&b).trim().to_string())
                .unwrap_or_default();
            content.match_tip = capture_label(&self.tip, &content.free_bet_section_text);
            content.match_odds = capture_label(&self.odds, &content.free_bet_section_text);
        }

        content.has_no_basic_tips = document
            .select(&self.other_markets_tab)
            .next()
            .map(|tab| element_text(&tab).contains(NO_BASIC_TIPS_MARKER))
            .unwrap_or(false);

        content.secondary_section_text = document
            .select(&self.v_tab)
            .next()
            .map(|tab| element_text(&tab).trim().to_string())
            .unwrap_or_default();

        content.raw_sections_html = document
            .select(&self.tabs_container)
            .next()
            .map(|container| container.inner_html())
            .unwrap_or_default();

        let record = BetRecord::new(content, captured_at);

        debug!(
            match_names = or_not_found(record.match_names()),
            tip = or_not_found(record.match_tip()),
            odds = or_not_found(record.match_odds()),
            no_basic_tips = record.has_no_basic_tips(),
            fingerprint = %record.fingerprint(),
            "Extracted bet data"
        );

        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn selector(css: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(css).map_err(|e| ExtractionError::Selector {
        selector: css.to_string(),
        message: e.to_string(),
    })
}

fn pattern(re: &str) -> Result<Regex, ExtractionError> {
    Regex::new(re).map_err(|e| ExtractionError::Pattern {
        pattern: re.to_string(),
        message: e.to_string(),
    })
}

/// Concatenated text of all descendant text nodes.
fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect()
}

/// First capture of a label rule, whitespace-normalised.
fn capture_label(re: &Regex, text: &str) -> String {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| normalize_whitespace(m.as_str()))
        .unwrap_or_default()
}

fn or_not_found(value: &str) -> &str {
    if value.is_empty() {
        "Not found"
    } else {
        value
    }
}

/// Collapse every whitespace run to a single space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
