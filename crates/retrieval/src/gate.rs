//! Answer quality gate
//!
//! Classifies a draft model answer as strong or weak and, on weak, falls
//! back to the best retrieved corpus answer. The user never sees an empty
//! string or a refusal phrase when a fallback exists.

use crate::fusion::RankedRecord;
use regex_lite::Regex;
use std::sync::OnceLock;

/// Fixed message emitted when the draft is weak and no candidate exists
pub const NO_ANSWER_MESSAGE: &str = "No exact answer in the dataset.";

/// Sentinel the completion prompt instructs the model to emit when the
/// context does not contain the answer
pub const NO_MATCH_SENTINEL: &str = "NO MATCH";

/// Refusal/uncertainty phrasing that marks a draft as weak
fn refusal_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)\b(i\s*(do\s*not|don['’]?t)\s*know|unknown|not\s*sure|no\s*(idea|information)|cannot\s*(answer|determine))\b",
        )
        .expect("refusal pattern is valid")
    })
}

/// A gated answer plus whether the draft was replaced
#[derive(Debug, Clone, PartialEq)]
pub struct GatedAnswer {
    pub text: String,
    pub fell_back: bool,
}

/// The quality gate; `min_length` is the weak-answer length floor
#[derive(Debug, Clone, Copy)]
pub struct AnswerGate {
    min_length: usize,
}

impl AnswerGate {
    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }

    /// Whether a draft answer is acceptable as-is
    ///
    /// Strong means: non-empty, no refusal phrasing, not the `NO MATCH`
    /// sentinel, and at least `min_length` chars. Short numeric facts and
    /// yes/no answers of at least 10 chars are accepted below the floor.
    pub fn is_strong(&self, draft: &str) -> bool {
        let text = draft.trim();
        if text.is_empty() {
            return false;
        }
        if text.eq_ignore_ascii_case(NO_MATCH_SENTINEL) {
            return false;
        }
        if refusal_pattern().is_match(text) {
            return false;
        }
        if text.chars().count() >= self.min_length {
            return true;
        }
        // Numeric facts are often short
        if text.chars().any(|c| c.is_ascii_digit() || c == '%') {
            return true;
        }
        let lower = text.to_lowercase();
        if (lower.starts_with("yes") || lower.starts_with("no")) && text.chars().count() >= 10 {
            return true;
        }
        false
    }

    /// Gate a draft answer against the merged candidate list
    ///
    /// Weak drafts are replaced by the first candidate that has an answer;
    /// with no candidates the fixed no-answer message is emitted. Applying
    /// the gate to its own output is a no-op.
    pub fn apply(&self, draft: &str, ranked: &[RankedRecord]) -> GatedAnswer {
        if self.is_strong(draft) {
            return GatedAnswer {
                text: draft.trim().to_string(),
                fell_back: false,
            };
        }

        let fallback = ranked
            .iter()
            .find_map(|candidate| candidate.record.first_answer());

        GatedAnswer {
            text: fallback.unwrap_or(NO_ANSWER_MESSAGE).to_string(),
            fell_back: true,
        }
    }
}
