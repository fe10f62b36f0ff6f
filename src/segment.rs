//! Sentence segmentation for narration.
//!
//! Extracted page text is split on runs of sentence-terminal punctuation
//! (`.`, `!`, `?`) into [`SpeakableUnit`]s. The delimiters themselves are
//! dropped and every unit is trimmed; units that end up empty are skipped.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").unwrap());

/// One sentence queued for the speech sink. Never empty, always trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakableUnit(String);

impl SpeakableUnit {
    fn new(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            None
        } else {
            Some(Self(text.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpeakableUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SpeakableUnit {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub fn segment(text: &str) -> Vec<SpeakableUnit> {
    SENTENCE_END
        .split(text)
        .filter_map(SpeakableUnit::new)
        .collect()
}
