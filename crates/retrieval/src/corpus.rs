//! Corpus model and store
//!
//! The corpus is an immutable, in-memory ordered sequence of Q/A records
//! with precomputed embeddings. It is loaded once per process (concurrent
//! callers await the same in-flight load) and replaced wholesale on reload;
//! matchers only ever see a consistent generation behind an `Arc`.

use async_trait::async_trait;
use rfpdesk_common::errors::{AppError, Result};
use rfpdesk_common::config::CorpusConfig;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, RwLock};

/// One corpus entry: a question, its answers, and a precomputed embedding
///
/// The first answer is canonical; further elements are alternates or notes.
/// Records with a missing or wrong-length embedding stay in the corpus and
/// are simply skipped by the semantic matcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub question: String,

    /// Normalized at ingestion: source files may carry a bare string here
    #[serde(default, deserialize_with = "answers_field")]
    pub answers: Vec<String>,

    #[serde(default)]
    pub embedding: Vec<f32>,
}

/// Source files are inconsistent about `answers`: some generations wrote a
/// single string, others an array. Normalize both into `Vec<String>` so
/// nothing downstream has to special-case.
fn answers_field<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum AnswersField {
        One(String),
        Many(Vec<String>),
    }

    Ok(match AnswersField::deserialize(deserializer)? {
        AnswersField::One(s) => vec![s],
        AnswersField::Many(v) => v,
    })
}

impl Record {
    /// The canonical answer: the first non-empty entry, trimmed
    pub fn first_answer(&self) -> Option<&str> {
        self.answers
            .iter()
            .map(|a| a.trim())
            .find(|a| !a.is_empty())
    }

    /// Identity key for deduplication across matcher outputs
    ///
    /// Duplicate questions with different first answers must not collapse
    /// into one entry, so the key combines both.
    pub fn dedup_key(&self) -> String {
        format!("{}::{}", self.question, self.first_answer().unwrap_or(""))
    }
}

/// The full in-memory record set for a session; immutable once built
#[derive(Debug, Default)]
pub struct Corpus {
    records: Vec<Record>,
}

impl Corpus {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A place the corpus JSON can be fetched from
#[async_trait]
pub trait CorpusSource: Send + Sync {
    /// Fetch and parse the full record set
    async fn fetch(&self) -> Result<Vec<Record>>;

    /// Human-readable location for logs
    fn describe(&self) -> String;
}

/// Static JSON file on local disk
pub struct FileCorpusSource {
    path: PathBuf,
}

impl FileCorpusSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CorpusSource for FileCorpusSource {
    async fn fetch(&self) -> Result<Vec<Record>> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| AppError::CorpusUnavailable {
                message: format!("Failed to read {}: {}", self.path.display(), e),
            })?;

        serde_json::from_slice(&bytes).map_err(|e| AppError::CorpusParse {
            message: format!("{}: {}", self.path.display(), e),
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Versioned JSON over HTTP, optionally cache-busted with a timestamp param
pub struct HttpCorpusSource {
    client: reqwest::Client,
    url: String,
    cache_bust: bool,
}

impl HttpCorpusSource {
    pub fn new(url: impl Into<String>, cache_bust: bool, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            url: url.into(),
            cache_bust,
        })
    }

    fn request_url(&self) -> String {
        if !self.cache_bust {
            return self.url.clone();
        }
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let sep = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}t={}", self.url, sep, now)
    }
}

#[async_trait]
impl CorpusSource for HttpCorpusSource {
    async fn fetch(&self) -> Result<Vec<Record>> {
        let url = self.request_url();

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::CorpusUnavailable {
                message: format!("Fetch from {} failed: {}", self.url, e),
            })?;

        if !response.status().is_success() {
            return Err(AppError::CorpusUnavailable {
                message: format!("Fetch from {} returned {}", self.url, response.status()),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::CorpusUnavailable {
                message: format!("Read from {} failed: {}", self.url, e),
            })?;

        serde_json::from_slice(&bytes).map_err(|e| AppError::CorpusParse {
            message: format!("{}: {}", self.url, e),
        })
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Pick a source implementation from configuration
pub fn source_from_config(config: &CorpusConfig) -> Result<Arc<dyn CorpusSource>> {
    if config.location.starts_with("http://") || config.location.starts_with("https://") {
        Ok(Arc::new(HttpCorpusSource::new(
            config.location.clone(),
            config.cache_bust,
            Duration::from_secs(config.fetch_timeout_secs),
        )?))
    } else {
        Ok(Arc::new(FileCorpusSource::new(config.location.clone())))
    }
}

/// Owner of the loaded corpus
///
/// Constructed once and handed into the query service; there are no ambient
/// globals. Loading is at-most-once per process: queries arriving before the
/// first load completes serialize on the guard and reuse its result instead
/// of triggering duplicate fetches.
#[derive(Default)]
pub struct CorpusStore {
    current: RwLock<Option<Arc<Corpus>>>,
    load_guard: Mutex<()>,
}

impl CorpusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently loaded corpus, if any
    pub async fn current(&self) -> Option<Arc<Corpus>> {
        self.current.read().await.clone()
    }

    /// Return the loaded corpus, loading it from `source` if necessary
    pub async fn get_or_load(&self, source: &dyn CorpusSource) -> Result<Arc<Corpus>> {
        if let Some(corpus) = self.current().await {
            return Ok(corpus);
        }

        let _guard = self.load_guard.lock().await;

        // A concurrent caller may have finished the load while we waited
        if let Some(corpus) = self.current().await {
            return Ok(corpus);
        }

        let corpus = self.load_inner(source).await?;
        Ok(corpus)
    }

    /// Refetch and atomically replace the corpus
    pub async fn reload(&self, source: &dyn CorpusSource) -> Result<Arc<Corpus>> {
        let _guard = self.load_guard.lock().await;
        self.load_inner(source).await
    }

    async fn load_inner(&self, source: &dyn CorpusSource) -> Result<Arc<Corpus>> {
        let records = source.fetch().await?;
        let corpus = Arc::new(Corpus::new(records));

        *self.current.write().await = Some(corpus.clone());

        rfpdesk_common::metrics::record_corpus_load(corpus.len());
        tracing::info!(
            source = %source.describe(),
            records = corpus.len(),
            "Corpus loaded"
        );

        Ok(corpus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answers_array_shape() {
        let record: Record = serde_json::from_str(
            r#"{"question":"What is your SLA?","answers":["99.9% uptime","see appendix"],"embedding":[1.0,0.0]}"#,
        )
        .unwrap();
        assert_eq!(record.answers.len(), 2);
        assert_eq!(record.first_answer(), Some("99.9% uptime"));
    }

    #[test]
    fn test_answers_string_shape_normalized() {
        let record: Record = serde_json::from_str(
            r#"{"question":"Do you support SSO?","answers":"Yes, via SAML 2.0."}"#,
        )
        .unwrap();
        assert_eq!(record.answers, vec!["Yes, via SAML 2.0.".to_string()]);
        assert!(record.embedding.is_empty());
    }

    #[test]
    fn test_first_answer_skips_blank_entries() {
        let record = Record {
            question: "q".into(),
            answers: vec!["   ".into(), "real answer".into()],
            embedding: vec![],
        };
        assert_eq!(record.first_answer(), Some("real answer"));
    }

    #[test]
    fn test_dedup_key_distinguishes_answers() {
        let a = Record {
            question: "What is the uptime?".into(),
            answers: vec!["99.9%".into()],
            embedding: vec![],
        };
        let b = Record {
            question: "What is the uptime?".into(),
            answers: vec!["99.99%".into()],
            embedding: vec![],
        };
        assert_ne!(a.dedup_key(), b.dedup_key());
    }

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

    struct FailingSource;

    #[async_trait]
    impl CorpusSource for FailingSource {
        async fn fetch(&self) -> Result<Vec<Record>> {
            Err(AppError::CorpusUnavailable {
                message: "down".into(),
            })
        }

        fn describe(&self) -> String {
            "failing".into()
        }
    }

    fn record(question: &str) -> Record {
        Record {
            question: question.into(),
            answers: vec!["answer".into()],
            embedding: vec![],
        }
    }

    #[tokio::test]
    async fn test_get_or_load_is_idempotent() {
        let store = CorpusStore::new();
        let source = StaticSource(vec![record("a"), record("b")]);

        let first = store.get_or_load(&source).await.unwrap();
        let second = store.get_or_load(&source).await.unwrap();

        assert_eq!(first.len(), 2);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_reload_replaces_corpus() {
        let store = CorpusStore::new();
        store
            .get_or_load(&StaticSource(vec![record("a")]))
            .await
            .unwrap();

        let replaced = store
            .reload(&StaticSource(vec![record("a"), record("b")]))
            .await
            .unwrap();

        assert_eq!(replaced.len(), 2);
        assert_eq!(store.current().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_load_failure_leaves_store_empty() {
        let store = CorpusStore::new();
        assert!(store.get_or_load(&FailingSource).await.is_err());
        assert!(store.current().await.is_none());
    }

    #[tokio::test]
    async fn test_file_source_missing_file() {
        let source = FileCorpusSource::new("/nonexistent/corpus.json");
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, AppError::CorpusUnavailable { .. }));
    }
}
