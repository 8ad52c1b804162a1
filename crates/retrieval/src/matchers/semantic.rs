//! Semantic matcher: cosine ranking over precomputed record embeddings

use super::ScoredMatch;
use crate::corpus::Corpus;
use crate::similarity::cosine_similarity;

/// Rank records by embedding similarity to the query vector
///
/// Records with a missing embedding, or one whose length differs from the
/// query vector, are skipped rather than scored against a truncated prefix.
/// Only scores strictly greater than `min_score` survive; ties are broken by
/// corpus order and the result is capped at `top_k`.
pub fn semantic_rank(
    query_vec: &[f32],
    corpus: &Corpus,
    min_score: f32,
    top_k: usize,
) -> Vec<ScoredMatch> {
    if query_vec.is_empty() {
        return Vec::new();
    }

    let mut skipped = 0usize;
    let mut scored: Vec<ScoredMatch> = corpus
        .records()
        .iter()
        .enumerate()
        .filter_map(|(index, record)| {
            if record.embedding.is_empty() || record.embedding.len() != query_vec.len() {
                skipped += 1;
                return None;
            }
            let score = cosine_similarity(query_vec, &record.embedding);
            (score > min_score).then_some(ScoredMatch { index, score })
        })
        .collect();

    if skipped > 0 {
        tracing::debug!(skipped, "Records without comparable embeddings excluded");
    }

    // Descending by score, corpus order on ties
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.index.cmp(&b.index))
    });
    scored.truncate(top_k);
    scored
}
