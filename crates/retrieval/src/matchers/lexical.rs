//! Lexical matcher: case-insensitive substring containment

use super::ScoredMatch;
use crate::corpus::Corpus;

/// Records whose question contains the case-folded query as a substring
///
/// Ordering is stable corpus order; every hit scores 1.0 since the match is
/// exact. An empty or whitespace-only query matches nothing.
pub fn lexical_match(query: &str, corpus: &Corpus) -> Vec<ScoredMatch> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }

    corpus
        .records()
        .iter()
        .enumerate()
        .filter(|(_, record)| record.question.to_lowercase().contains(&query))
        .map(|(index, _)| ScoredMatch { index, score: 1.0 })
        .collect()
}
