//! The three retrieval strategies
//!
//! - Lexical: exact case-insensitive substring match on question text
//! - Fuzzy: approximate match tolerant of typos and word order
//! - Semantic: cosine ranking over precomputed embeddings
//!
//! Matchers are pure over the corpus: they return index/score pairs and
//! never fail. Missing inputs degrade to an empty result.

pub mod fuzzy;
pub mod lexical;
pub mod semantic;

pub use fuzzy::FuzzyMatcher;
pub use lexical::lexical_match;
pub use semantic::semantic_rank;

use serde::{Deserialize, Serialize};

/// A single matcher hit: corpus index plus a score normalized to [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredMatch {
    /// Index into the corpus record sequence
    pub index: usize,

    /// Normalized relevance (1.0 = exact)
    pub score: f32,
}

/// Which matcher produced a candidate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    /// Exact substring hit
    Lexical,
    /// Approximate string match
    Fuzzy,
    /// Embedding similarity
    Semantic,
}

impl MatchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchSource::Lexical => "lexical",
            MatchSource::Fuzzy => "fuzzy",
            MatchSource::Semantic => "semantic",
        }
    }
}
