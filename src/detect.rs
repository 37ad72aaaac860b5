//! Change detection.
//!
//! Classifies the transition between the last stored snapshot and a freshly
//! extracted record. Pure: no I/O, same inputs always give the same answer.

use std::fmt;

use crate::types::{BetRecord, StoredState};

/// How the current record relates to the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing stored yet. Persist and acknowledge once.
    FirstObservation,
    /// Same fingerprint as the stored snapshot. Do nothing.
    Unchanged,
    /// Different fingerprint. Persist, then notify.
    Changed,
}

impl Transition {
    /// Whether the current record should be written to the store.
    pub fn should_persist(self) -> bool {
        !matches!(self, Transition::Unchanged)
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::FirstObservation => write!(f, "first-observation"),
            Transition::Unchanged => write!(f, "unchanged"),
            Transition::Changed => write!(f, "changed"),
        }
    }
}

/// Classify `current` against the previously stored state.
///
/// A stored document without a hash is treated the same as no document.
pub fn classify(previous: Option<&StoredState>, current: &BetRecord) -> Transition {
    match previous.and_then(StoredState::fingerprint) {
        None => Transition::FirstObservation,
        Some(prev) if &prev == current.fingerprint() => Transition::Unchanged,
        Some(_) => Transition::Changed,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BetContent;
    use chrono::Utc;

    fn record(section: &str) -> BetRecord {
        BetRecord::new(
            BetContent {
                free_bet_section_text: section.to_string(),
                ..Default::default()
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_absent_previous_is_first_observation() {
        for section in ["", "X", "Match Tip: Home"] {
            assert_eq!(classify(None, &record(section)), Transition::FirstObservation);
        }
    }

    #[test]
    fn test_previous_without_hash_is_first_observation() {
        let stored = StoredState::default();
        assert_eq!(classify(Some(&stored), &record("X")), Transition::FirstObservation);
    }

    #[test]
    fn test_same_fingerprint_is_unchanged() {
        let stored = StoredState::from(&record("X"));
        assert_eq!(classify(Some(&stored), &record("X")), Transition::Unchanged);
    }

    #[test]
    fn test_different_fingerprint_is_changed() {
        let stored = StoredState::from(&record("X"));
        assert_eq!(classify(Some(&stored), &record("Y")), Transition::Changed);
    }

    #[test]
    fn test_stored_hash_case_is_ignored() {
        let current = record("X");
        let stored = StoredState {
            hash: current.fingerprint().as_str().to_uppercase(),
            ..Default::default()
        };
        assert_eq!(classify(Some(&stored), &current), Transition::Unchanged);
    }

    #[test]
    fn test_classification_is_repeatable() {
        let stored = StoredState::from(&record("X"));
        let current = record("Y");
        let first = classify(Some(&stored), &current);
        for _ in 0..5 {
            assert_eq!(classify(Some(&stored), &current), first);
        }
    }

    #[test]
    fn test_should_persist() {
        assert!(Transition::FirstObservation.should_persist());
        assert!(Transition::Changed.should_persist());
        assert!(!Transition::Unchanged.should_persist());
    }
}
