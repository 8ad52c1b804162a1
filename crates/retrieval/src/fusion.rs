//! Candidate fusion across the three matchers
//!
//! Merges semantic, fuzzy, and lexical hits into one ranked, deduplicated,
//! capped candidate list. Matcher scores are already normalized to [0, 1]
//! at the matcher boundary (embedding: raw cosine, fuzzy: relative to the
//! best hit, lexical: constant 1.0 since hits are exact), so they can be
//! compared when the same record surfaces from several sources.

use crate::corpus::{Corpus, Record};
use crate::matchers::{MatchSource, ScoredMatch};
use rfpdesk_common::config::MergePrecedence;
use std::collections::HashMap;

/// One element of the merged candidate list
#[derive(Debug, Clone)]
pub struct RankedRecord {
    pub record: Record,
    pub score: f32,
    pub source: MatchSource,
}

/// Merge matcher outputs into a ranked, deduplicated candidate list
///
/// Precedence decides which source's ordering wins: the first source to
/// surface a record fixes its rank, later sources can only raise its score.
/// Dedup key is `question + "::" + first answer`, so duplicate questions
/// with different answers survive as separate candidates. Output is capped
/// at `cap`; empty inputs produce an empty list.
pub fn merge(
    corpus: &Corpus,
    semantic: &[ScoredMatch],
    fuzzy: &[ScoredMatch],
    lexical: &[ScoredMatch],
    precedence: MergePrecedence,
    cap: usize,
) -> Vec<RankedRecord> {
    let sources: [(&[ScoredMatch], MatchSource); 3] = match precedence {
        MergePrecedence::SemanticFirst => [
            (semantic, MatchSource::Semantic),
            (fuzzy, MatchSource::Fuzzy),
            (lexical, MatchSource::Lexical),
        ],
        MergePrecedence::LexicalFirst => [
            (lexical, MatchSource::Lexical),
            (fuzzy, MatchSource::Fuzzy),
            (semantic, MatchSource::Semantic),
        ],
    };

    let mut by_key: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<RankedRecord> = Vec::new();

    for (matches, source) in sources {
        for hit in matches {
            let Some(record) = corpus.get(hit.index) else {
                continue;
            };

            let key = record.dedup_key();
            match by_key.get(&key) {
                Some(&pos) => {
                    // Seen from an earlier source: keep the higher score
                    if hit.score > merged[pos].score {
                        merged[pos].score = hit.score;
                        merged[pos].source = source;
                    }
                }
                None => {
                    by_key.insert(key, merged.len());
                    merged.push(RankedRecord {
                        record: record.clone(),
                        score: hit.score,
                        source,
                    });
                }
            }
        }
    }

    merged.truncate(cap);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn record(question: &str, answer: &str) -> Record {
        Record {
            question: question.into(),
            answers: vec![answer.into()],
            embedding: vec![],
        }
    }

    fn corpus() -> Corpus {
        Corpus::new(vec![
            record("q0", "a0"),
            record("q1", "a1"),
            record("q2", "a2"),
            record("q0", "a0"), // duplicate identity of index 0
        ])
    }

    fn hit(index: usize, score: f32) -> ScoredMatch {
        ScoredMatch { index, score }
    }

    #[test]
    fn test_semantic_first_precedence() {
        let merged = merge(
            &corpus(),
            &[hit(1, 0.9)],
            &[hit(2, 0.8)],
            &[hit(0, 1.0)],
            MergePrecedence::SemanticFirst,
            10,
        );
        let questions: Vec<&str> = merged.iter().map(|r| r.record.question.as_str()).collect();
        assert_eq!(questions, vec!["q1", "q2", "q0"]);
    }

    #[test]
    fn test_lexical_first_precedence() {
        let merged = merge(
            &corpus(),
            &[hit(1, 0.9)],
            &[hit(2, 0.8)],
            &[hit(0, 1.0)],
            MergePrecedence::LexicalFirst,
            10,
        );
        let questions: Vec<&str> = merged.iter().map(|r| r.record.question.as_str()).collect();
        assert_eq!(questions, vec!["q0", "q2", "q1"]);
    }

    #[test]
    fn test_dedup_invariant() {
        // Index 0 and 3 share the same identity key
        let merged = merge(
            &corpus(),
            &[hit(0, 0.5), hit(3, 0.4)],
            &[hit(0, 0.9)],
            &[hit(0, 1.0)],
            MergePrecedence::SemanticFirst,
            10,
        );
        let keys: HashSet<String> = merged.iter().map(|r| r.record.dedup_key()).collect();
        assert_eq!(keys.len(), merged.len());
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_duplicate_keeps_highest_score() {
        let merged = merge(
            &corpus(),
            &[hit(1, 0.4)],
            &[hit(1, 0.95)],
            &[],
            MergePrecedence::SemanticFirst,
            10,
        );
        assert_eq!(merged.len(), 1);
        assert!((merged[0].score - 0.95).abs() < 1e-6);
        assert_eq!(merged[0].source, MatchSource::Fuzzy);
    }

    #[test]
    fn test_cap_invariant() {
        let merged = merge(
            &corpus(),
            &[hit(0, 0.9), hit(1, 0.8), hit(2, 0.7)],
            &[],
            &[],
            MergePrecedence::SemanticFirst,
            2,
        );
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_empty_inputs_yield_empty_output() {
        let merged = merge(
            &corpus(),
            &[],
            &[],
            &[],
            MergePrecedence::SemanticFirst,
            10,
        );
        assert!(merged.is_empty());
    }

    #[test]
    fn test_out_of_range_index_is_skipped() {
        let merged = merge(
            &corpus(),
            &[hit(99, 0.9)],
            &[],
            &[],
            MergePrecedence::SemanticFirst,
            10,
        );
        assert!(merged.is_empty());
    }
}
