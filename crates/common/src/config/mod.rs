//! Configuration management for RFPDesk services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Corpus source configuration
    pub corpus: CorpusConfig,

    /// Embedding provider configuration
    pub embedding: EmbeddingConfig,

    /// Completion provider configuration
    pub completion: CompletionConfig,

    /// Ranking and merge tuning
    pub ranking: RankingConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorpusConfig {
    /// Where the corpus JSON lives: a local path or an http(s) URL
    #[serde(default = "default_corpus_location")]
    pub location: String,

    /// Append a cache-busting timestamp query param on http fetches
    #[serde(default = "default_cache_bust")]
    pub cache_bust: bool,

    /// Fetch timeout in seconds (http sources)
    #[serde(default = "default_corpus_timeout")]
    pub fetch_timeout_secs: u64,

    /// Load the corpus eagerly at startup instead of on first query
    #[serde(default = "default_preload")]
    pub preload: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: openai, mock
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for the embedding service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries
    #[serde(default = "default_provider_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompletionConfig {
    /// Completion provider: openai, mock
    #[serde(default = "default_completion_provider")]
    pub provider: String,

    /// API key for the completion service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_completion_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum output tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

/// Merge precedence when deduplicating candidates from multiple matchers
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MergePrecedence {
    /// Embedding results first, then fuzzy, then lexical
    SemanticFirst,
    /// Lexical results first, then fuzzy, then embedding
    LexicalFirst,
}

/// The single tuning surface for the retrieval pipeline
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RankingConfig {
    /// Dedup precedence across matcher outputs
    #[serde(default = "default_precedence")]
    pub precedence: MergePrecedence,

    /// Minimum cosine score for an embedding match (strict greater-than)
    #[serde(default = "default_embedding_min_score")]
    pub embedding_min_score: f32,

    /// Maximum embedding matches to keep
    #[serde(default = "default_embedding_top_k")]
    pub embedding_top_k: usize,

    /// Fuzzy dissimilarity cutoff; matches scoring below 1 - threshold
    /// (normalized) are dropped
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f32,

    /// Maximum fuzzy matches to keep
    #[serde(default = "default_fuzzy_limit")]
    pub fuzzy_limit: usize,

    /// Cap on the merged candidate list
    #[serde(default = "default_merge_cap")]
    pub merge_cap: usize,

    /// Maximum Q/A blocks in the model context
    #[serde(default = "default_context_max_items")]
    pub context_max_items: usize,

    /// Character budget for the model context
    #[serde(default = "default_context_max_chars")]
    pub context_max_chars: usize,

    /// Draft answers shorter than this are weak unless numeric/affirmative
    #[serde(default = "default_weak_answer_min_length")]
    pub weak_answer_min_length: usize,

    /// Bound on external provider calls inside the pipeline, in seconds
    #[serde(default = "default_pipeline_timeout")]
    pub provider_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 30 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_corpus_location() -> String { "data/corpus.json".to_string() }
fn default_cache_bust() -> bool { true }
fn default_corpus_timeout() -> u64 { 15 }
fn default_preload() -> bool { true }
fn default_embedding_provider() -> String { "openai".to_string() }
fn default_embedding_model() -> String { "text-embedding-3-small".to_string() }
fn default_embedding_dimension() -> usize { 1536 }
fn default_provider_timeout() -> u64 { 30 }
fn default_provider_retries() -> u32 { 3 }
fn default_completion_provider() -> String { "openai".to_string() }
fn default_completion_model() -> String { "gpt-4o-mini".to_string() }
fn default_temperature() -> f32 { 0.2 }
fn default_max_tokens() -> usize { 400 }
fn default_precedence() -> MergePrecedence { MergePrecedence::SemanticFirst }
fn default_embedding_min_score() -> f32 { 0.28 }
fn default_embedding_top_k() -> usize { 20 }
fn default_fuzzy_threshold() -> f32 { 0.35 }
fn default_fuzzy_limit() -> usize { 20 }
fn default_merge_cap() -> usize { 12 }
fn default_context_max_items() -> usize { 8 }
fn default_context_max_chars() -> usize { 1800 }
fn default_weak_answer_min_length() -> usize { 24 }
fn default_pipeline_timeout() -> u64 { 8 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "rfpdesk".to_string() }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }
}

impl RankingConfig {
    /// Provider call bound as a Duration
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            precedence: default_precedence(),
            embedding_min_score: default_embedding_min_score(),
            embedding_top_k: default_embedding_top_k(),
            fuzzy_threshold: default_fuzzy_threshold(),
            fuzzy_limit: default_fuzzy_limit(),
            merge_cap: default_merge_cap(),
            context_max_items: default_context_max_items(),
            context_max_chars: default_context_max_chars(),
            weak_answer_min_length: default_weak_answer_min_length(),
            provider_timeout_secs: default_pipeline_timeout(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                request_timeout_secs: default_request_timeout(),
                shutdown_timeout_secs: default_shutdown_timeout(),
            },
            corpus: CorpusConfig {
                location: default_corpus_location(),
                cache_bust: default_cache_bust(),
                fetch_timeout_secs: default_corpus_timeout(),
                preload: default_preload(),
            },
            embedding: EmbeddingConfig {
                provider: default_embedding_provider(),
                api_key: None,
                api_base: None,
                model: default_embedding_model(),
                dimension: default_embedding_dimension(),
                timeout_secs: default_provider_timeout(),
                max_retries: default_provider_retries(),
            },
            completion: CompletionConfig {
                provider: default_completion_provider(),
                api_key: None,
                api_base: None,
                model: default_completion_model(),
                timeout_secs: default_provider_timeout(),
                temperature: default_temperature(),
                max_tokens: default_max_tokens(),
            },
            ranking: RankingConfig::default(),
            observability: ObservabilityConfig {
                log_level: default_log_level(),
                json_logging: default_json_logging(),
                metrics_port: default_metrics_port(),
                service_name: default_service_name(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.embedding.model, "text-embedding-3-small");
        assert_eq!(config.completion.model, "gpt-4o-mini");
    }

    #[test]
    fn test_ranking_defaults() {
        let ranking = RankingConfig::default();
        assert_eq!(ranking.precedence, MergePrecedence::SemanticFirst);
        assert!((ranking.embedding_min_score - 0.28).abs() < f32::EPSILON);
        assert!((ranking.fuzzy_threshold - 0.35).abs() < f32::EPSILON);
        assert_eq!(ranking.weak_answer_min_length, 24);
        assert_eq!(ranking.merge_cap, 12);
    }
}
