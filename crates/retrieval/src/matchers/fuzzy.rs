//! Fuzzy matcher built on nucleo-matcher
//!
//! Approximate matching over question text, with the canonical answer as a
//! down-weighted secondary target. nucleo scores are query-relative, so they
//! are normalized against the best hit before the dissimilarity cutoff is
//! applied.

use super::ScoredMatch;
use crate::corpus::Corpus;
use nucleo_matcher::{
    pattern::{CaseMatching, Normalization, Pattern},
    Config, Matcher, Utf32String,
};

/// Weight applied to answer-text hits relative to question-text hits
const ANSWER_WEIGHT: f32 = 0.5;

/// Fuzzy search over corpus questions
pub struct FuzzyMatcher {
    matcher: Matcher,
}

impl FuzzyMatcher {
    pub fn new() -> Self {
        Self {
            matcher: Matcher::new(Config::DEFAULT),
        }
    }

    /// Rank corpus records against the query, best first
    ///
    /// `threshold` is a dissimilarity cutoff: normalized scores below
    /// `1.0 - threshold` are dropped. Empty query or empty corpus yield an
    /// empty result, never an error.
    pub fn rank(
        &mut self,
        query: &str,
        corpus: &Corpus,
        threshold: f32,
        limit: usize,
    ) -> Vec<ScoredMatch> {
        if query.trim().is_empty() || corpus.is_empty() {
            return Vec::new();
        }

        let pattern = Pattern::parse(query, CaseMatching::Ignore, Normalization::Smart);

        let mut scored: Vec<(usize, f32)> = corpus
            .records()
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                let question = Utf32String::from(record.question.as_str());
                let question_score = pattern
                    .score(question.slice(..), &mut self.matcher)
                    .map(|s| s as f32);

                let answer_score = record.first_answer().and_then(|answer| {
                    let haystack = Utf32String::from(answer);
                    pattern
                        .score(haystack.slice(..), &mut self.matcher)
                        .map(|s| s as f32 * ANSWER_WEIGHT)
                });

                let best = match (question_score, answer_score) {
                    (Some(q), Some(a)) => q.max(a),
                    (Some(q), None) => q,
                    (None, Some(a)) => a,
                    (None, None) => return None,
                };

                Some((index, best))
            })
            .collect();

        // Best first, corpus order on ties
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let max_score = match scored.first() {
            Some((_, s)) if *s > 0.0 => *s,
            _ => return Vec::new(),
        };

        let min_normalized = 1.0 - threshold;

        scored
            .into_iter()
            .map(|(index, score)| ScoredMatch {
                index,
                score: score / max_score,
            })
            .filter(|m| m.score >= min_normalized)
            .take(limit)
            .collect()
    }
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Record;

    fn record(question: &str, answer: &str) -> Record {
        Record {
            question: question.into(),
            answers: vec![answer.into()],
            embedding: vec![],
        }
    }

    fn corpus() -> Corpus {
        Corpus::new(vec![
            record("What is your uptime guarantee?", "99.9% monthly"),
            record("Do you support single sign-on?", "Yes, SAML and OIDC"),
            record("Where are your data centers located?", "US and EU regions"),
        ])
    }

    #[test]
    fn test_close_match_ranks_first() {
        let mut fuzzy = FuzzyMatcher::new();
        let hits = fuzzy.rank("uptime guarantee", &corpus(), 0.35, 20);
        assert!(!hits.is_empty());
        assert_eq!(hits[0].index, 0);
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_typo_tolerance() {
        let mut fuzzy = FuzzyMatcher::new();
        // "guarante" (dropped letter) should still surface the uptime record
        let hits = fuzzy.rank("uptime guarante", &corpus(), 0.35, 20);
        assert!(hits.iter().any(|h| h.index == 0));
    }

    #[test]
    fn test_empty_query_and_empty_corpus() {
        let mut fuzzy = FuzzyMatcher::new();
        assert!(fuzzy.rank("", &corpus(), 0.35, 20).is_empty());
        assert!(fuzzy.rank("uptime", &Corpus::default(), 0.35, 20).is_empty());
    }

    #[test]
    fn test_scores_normalized_to_unit_range() {
        let mut fuzzy = FuzzyMatcher::new();
        let hits = fuzzy.rank("support", &corpus(), 1.0, 20);
        for hit in hits {
            assert!(hit.score > 0.0 && hit.score <= 1.0);
        }
    }

    #[test]
    fn test_limit_is_respected() {
        let mut fuzzy = FuzzyMatcher::new();
        let hits = fuzzy.rank("you", &corpus(), 1.0, 1);
        assert!(hits.len() <= 1);
    }
}
