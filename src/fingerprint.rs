//! Content fingerprinting.
//!
//! Reduces the content-bearing fields of a `BetRecord` to a fixed-width
//! digest used for change detection. The digest covers, in order and with
//! no separator: the free-bet section text, the secondary (V-tab) section
//! text, and `"true"`/`"false"` for the no-basic-tips marker. Timestamps and
//! raw markup never take part.
//!
//! Both texts are whitespace-normalised before hashing, so markup reflow
//! (re-indented HTML, extra spaces inside the tip) does not count as a change.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::extract::normalize_whitespace;
use crate::types::BetRecord;

/// Digest width in bytes (128 bits, rendered as 32 hex characters).
const DIGEST_BYTES: usize = 16;

/// Lowercase hex digest of a record's content-bearing fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap a hash read back from a record store.
    ///
    /// Returns `None` for an empty value, which callers treat as "no prior
    /// observation".
    pub fn from_stored(hash: &str) -> Option<Self> {
        let hash = hash.trim();
        if hash.is_empty() {
            None
        } else {
            Some(Self(hash.to_ascii_lowercase()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the fingerprint of the content-bearing fields.
pub fn digest(free_bet_text: &str, secondary_text: &str, has_no_basic_tips: bool) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(normalize_whitespace(free_bet_text).as_bytes());
    hasher.update(normalize_whitespace(secondary_text).as_bytes());
    hasher.update(if has_no_basic_tips { b"true".as_slice() } else { b"false".as_slice() });
    let hash = hasher.finalize();
    Fingerprint(hex::encode(&hash[..DIGEST_BYTES]))
}

/// Recompute the fingerprint of an existing record from its fields.
pub fn of(record: &BetRecord) -> Fingerprint {
    digest(
        record.free_bet_section_text(),
        record.secondary_section_text(),
        record.has_no_basic_tips(),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
