//! Query service: the full retrieve-merge-synthesize-gate pipeline
//!
//! Owns the corpus store and the provider clients. `search` gives the
//! grouped per-matcher view for display; `chat` runs the whole pipeline and
//! always produces a non-empty text answer.

use crate::context::build_context;
use crate::corpus::{Corpus, CorpusSource, CorpusStore};
use crate::fusion::{merge, RankedRecord};
use crate::gate::{AnswerGate, NO_ANSWER_MESSAGE};
use crate::matchers::{lexical_match, semantic_rank, FuzzyMatcher, MatchSource, ScoredMatch};
use crate::synth;
use rfpdesk_common::completion::ChatCompleter;
use rfpdesk_common::config::RankingConfig;
use rfpdesk_common::embeddings::Embedder;
use rfpdesk_common::errors::{AppError, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Queries shorter than this return the empty grouping from `search`
const MIN_SEARCH_QUERY_CHARS: usize = 3;

/// One display row: a record plus where it came from
#[derive(Debug, Clone, Serialize)]
pub struct MatchSummary {
    pub question: String,
    pub answer: String,
    pub score: f32,
    pub source: MatchSource,
}

/// Grouped, non-deduplicated matcher view for display
#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupedMatches {
    /// Exact substring hits
    pub direct: Vec<MatchSummary>,
    /// Approximate matches
    pub fuzzy: Vec<MatchSummary>,
    /// Embedding-similarity matches
    pub contextual: Vec<MatchSummary>,
}

/// The query service; one instance per process, shared across requests
pub struct QaService {
    store: Arc<CorpusStore>,
    source: Arc<dyn CorpusSource>,
    embedder: Arc<dyn Embedder>,
    completer: Arc<dyn ChatCompleter>,
    ranking: RankingConfig,
    gate: AnswerGate,
}

impl QaService {
    pub fn new(
        store: Arc<CorpusStore>,
        source: Arc<dyn CorpusSource>,
        embedder: Arc<dyn Embedder>,
        completer: Arc<dyn ChatCompleter>,
        ranking: RankingConfig,
    ) -> Self {
        let gate = AnswerGate::new(ranking.weak_answer_min_length);
        Self {
            store,
            source,
            embedder,
            completer,
            ranking,
            gate,
        }
    }

    /// Number of records in the loaded corpus, if any
    pub async fn corpus_size(&self) -> Option<usize> {
        self.store.current().await.map(|c| c.len())
    }

    /// Refetch and atomically replace the corpus
    pub async fn reload_corpus(&self) -> Result<usize> {
        let corpus = self.store.reload(&*self.source).await?;
        Ok(corpus.len())
    }

    /// Grouped per-matcher results for display
    ///
    /// Short queries return the empty grouping. A missing corpus degrades
    /// every group to empty; only a corpus parse failure propagates.
    pub async fn search(&self, query: &str) -> Result<GroupedMatches> {
        let start = Instant::now();
        let query = query.trim();

        if query.chars().count() < MIN_SEARCH_QUERY_CHARS {
            return Ok(GroupedMatches::default());
        }

        let Some(corpus) = self.corpus_or_degrade().await? else {
            return Ok(GroupedMatches::default());
        };

        let direct = lexical_match(query, &corpus);
        let fuzzy = FuzzyMatcher::new().rank(
            query,
            &corpus,
            self.ranking.fuzzy_threshold,
            self.ranking.fuzzy_limit,
        );

        let contextual = match self.embed_query(query).await {
            Some(query_vec) => semantic_rank(
                &query_vec,
                &corpus,
                self.ranking.embedding_min_score,
                self.ranking.embedding_top_k,
            ),
            None => Vec::new(),
        };

        let grouped = GroupedMatches {
            direct: summarize(&corpus, &direct, MatchSource::Lexical),
            fuzzy: summarize(&corpus, &fuzzy, MatchSource::Fuzzy),
            contextual: summarize(&corpus, &contextual, MatchSource::Semantic),
        };

        let total = grouped.direct.len() + grouped.fuzzy.len() + grouped.contextual.len();
        rfpdesk_common::metrics::record_search(start.elapsed().as_secs_f64(), total);
        tracing::debug!(
            query_len = query.len(),
            direct = grouped.direct.len(),
            fuzzy = grouped.fuzzy.len(),
            contextual = grouped.contextual.len(),
            "Search complete"
        );

        Ok(grouped)
    }

    /// One merged, gated natural-language answer
    ///
    /// Always a non-empty string; every degraded path bottoms out at the
    /// fixed no-answer message rather than an error.
    pub async fn chat(&self, query: &str) -> Result<String> {
        let start = Instant::now();
        let query = query.trim();

        if query.is_empty() {
            return Ok(NO_ANSWER_MESSAGE.to_string());
        }

        let Some(corpus) = self.corpus_or_degrade().await? else {
            return Ok(NO_ANSWER_MESSAGE.to_string());
        };

        let ranked = self.rank(query, &corpus).await;

        let context = build_context(
            &ranked,
            self.ranking.context_max_items,
            self.ranking.context_max_chars,
        );

        let draft = synth::draft_answer(
            &*self.completer,
            query,
            &context,
            self.ranking.provider_timeout(),
        )
        .await;

        let gated = self.gate.apply(&draft, &ranked);
        rfpdesk_common::metrics::record_chat(start.elapsed().as_secs_f64(), gated.fell_back);
        tracing::debug!(
            candidates = ranked.len(),
            fell_back = gated.fell_back,
            "Chat complete"
        );

        Ok(gated.text)
    }

    /// Run all three matchers and merge their outputs
    async fn rank(&self, query: &str, corpus: &Corpus) -> Vec<RankedRecord> {
        let lexical = lexical_match(query, corpus);
        let fuzzy = FuzzyMatcher::new().rank(
            query,
            corpus,
            self.ranking.fuzzy_threshold,
            self.ranking.fuzzy_limit,
        );

        // The embedding leg is the only external dependency; a timeout or
        // provider failure degrades it to empty instead of stalling the
        // pipeline.
        let semantic = match self.embed_query(query).await {
            Some(query_vec) => semantic_rank(
                &query_vec,
                corpus,
                self.ranking.embedding_min_score,
                self.ranking.embedding_top_k,
            ),
            None => Vec::new(),
        };

        merge(
            corpus,
            &semantic,
            &fuzzy,
            &lexical,
            self.ranking.precedence,
            self.ranking.merge_cap,
        )
    }

    /// Embed the query under the pipeline timeout; absent on any failure
    async fn embed_query(&self, query: &str) -> Option<Vec<f32>> {
        let timeout = self.ranking.provider_timeout();
        match tokio::time::timeout(timeout, self.embedder.embed(query)).await {
            Ok(Ok(vector)) => Some(vector),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Query embedding failed, skipping semantic leg");
                None
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "Query embedding timed out, skipping semantic leg"
                );
                None
            }
        }
    }

    /// The corpus, or None when loading degrades gracefully
    ///
    /// A malformed corpus file is the one pipeline-terminating failure;
    /// anything else (missing file, unreachable source) degrades to "no
    /// corpus" and the caller falls through to its empty/fixed output.
    async fn corpus_or_degrade(&self) -> Result<Option<Arc<Corpus>>> {
        match self.store.get_or_load(&*self.source).await {
            Ok(corpus) => Ok(Some(corpus)),
            Err(e @ AppError::CorpusParse { .. }) => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "Corpus unavailable, degrading to empty results");
                Ok(None)
            }
        }
    }
}

fn summarize(corpus: &Corpus, matches: &[ScoredMatch], source: MatchSource) -> Vec<MatchSummary> {
    matches
        .iter()
        .filter_map(|hit| {
            corpus.get(hit.index).map(|record| MatchSummary {
                question: record.question.clone(),
                answer: record.first_answer().unwrap_or("").to_string(),
                score: hit.score,
                source,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Record;
    use async_trait::async_trait;

    struct StaticSource(Vec<Record>);

    #[async_trait]
    impl CorpusSource for StaticSource {
        async fn fetch(&self) -> Result<Vec<Record>> {
            Ok(self.0.clone())
        }

        fn describe(&self) -> String {
            "static".into()
        }
    }

    struct DownSource;

    #[async_trait]
    impl CorpusSource for DownSource {
        async fn fetch(&self) -> Result<Vec<Record>> {
            Err(AppError::CorpusUnavailable {
                message: "unreachable".into(),
            })
        }

        fn describe(&self) -> String {
            "down".into()
        }
    }

    /// Always returns the same vector, standing in for a live provider
    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }

        fn model_name(&self) -> &str {
            "fixed"
        }

        fn dimension(&self) -> usize {
            self.0.len()
        }
    }

    struct DownEmbedder;

    #[async_trait]
    impl Embedder for DownEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(AppError::EmbeddingError {
                message: "offline".into(),
            })
        }

        fn model_name(&self) -> &str {
            "down"
        }

        fn dimension(&self) -> usize {
            0
        }
    }

    struct FixedCompleter(&'static str);

    #[async_trait]
    impl ChatCompleter for FixedCompleter {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    struct DownCompleter;

    #[async_trait]
    impl ChatCompleter for DownCompleter {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            Err(AppError::CompletionError {
                message: "offline".into(),
            })
        }

        fn model_name(&self) -> &str {
            "down"
        }
    }

    fn sla_corpus() -> Vec<Record> {
        vec![Record {
            question: "What is your SLA?".into(),
            answers: vec!["99.9% uptime".into()],
            embedding: vec![1.0, 0.0],
        }]
    }

    fn service(
        records: Vec<Record>,
        embedder: Arc<dyn Embedder>,
        completer: Arc<dyn ChatCompleter>,
    ) -> QaService {
        QaService::new(
            Arc::new(CorpusStore::new()),
            Arc::new(StaticSource(records)),
            embedder,
            completer,
            RankingConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_lexical_hit_and_completion_outage_fall_back_to_corpus_answer() {
        // Scenario: provider down, exact substring hit carries the answer
        let svc = service(
            sla_corpus(),
            Arc::new(DownEmbedder),
            Arc::new(DownCompleter),
        );

        let grouped = svc.search("sla").await.unwrap();
        assert_eq!(grouped.direct.len(), 1);
        assert_eq!(grouped.direct[0].answer, "99.9% uptime");

        let answer = svc.chat("sla").await.unwrap();
        assert_eq!(answer, "99.9% uptime");
    }

    #[tokio::test]
    async fn test_refusal_draft_replaced_by_top_candidate() {
        let svc = service(
            sla_corpus(),
            Arc::new(FixedEmbedder(vec![1.0, 0.0])),
            Arc::new(FixedCompleter("I don't know")),
        );
        assert_eq!(svc.chat("sla").await.unwrap(), "99.9% uptime");
    }

    #[tokio::test]
    async fn test_strong_draft_passes_through() {
        let svc = service(
            sla_corpus(),
            Arc::new(FixedEmbedder(vec![1.0, 0.0])),
            Arc::new(FixedCompleter("92% of customers renew annually.")),
        );
        assert_eq!(
            svc.chat("sla").await.unwrap(),
            "92% of customers renew annually."
        );
    }

    #[tokio::test]
    async fn test_empty_corpus_and_empty_query() {
        let svc = service(Vec::new(), Arc::new(DownEmbedder), Arc::new(DownCompleter));

        let grouped = svc.search("").await.unwrap();
        assert!(grouped.direct.is_empty());
        assert!(grouped.fuzzy.is_empty());
        assert!(grouped.contextual.is_empty());

        assert_eq!(svc.chat("").await.unwrap(), NO_ANSWER_MESSAGE);
    }

    #[tokio::test]
    async fn test_corpus_outage_degrades_to_fixed_message() {
        let svc = QaService::new(
            Arc::new(CorpusStore::new()),
            Arc::new(DownSource),
            Arc::new(DownEmbedder),
            Arc::new(DownCompleter),
            RankingConfig::default(),
        );

        let grouped = svc.search("anything").await.unwrap();
        assert!(grouped.direct.is_empty());
        assert_eq!(svc.chat("anything").await.unwrap(), NO_ANSWER_MESSAGE);
    }

    #[tokio::test]
    async fn test_short_query_returns_empty_grouping() {
        let svc = service(
            sla_corpus(),
            Arc::new(DownEmbedder),
            Arc::new(DownCompleter),
        );
        let grouped = svc.search("sl").await.unwrap();
        assert!(grouped.direct.is_empty());
    }

    #[tokio::test]
    async fn test_orthogonal_query_vector_excluded_from_contextual() {
        // Record embedding [1,0] against query vector [0,1]: cosine 0
        let svc = service(
            sla_corpus(),
            Arc::new(FixedEmbedder(vec![0.0, 1.0])),
            Arc::new(DownCompleter),
        );
        let grouped = svc.search("completely unrelated words").await.unwrap();
        assert!(grouped.contextual.is_empty());
    }

    #[tokio::test]
    async fn test_reload_reports_size() {
        let svc = service(
            sla_corpus(),
            Arc::new(DownEmbedder),
            Arc::new(DownCompleter),
        );
        assert_eq!(svc.corpus_size().await, None);
        assert_eq!(svc.reload_corpus().await.unwrap(), 1);
        assert_eq!(svc.corpus_size().await, Some(1));
    }
}
