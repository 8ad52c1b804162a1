//! RFPDesk Common Library
//!
//! Shared code for the RFPDesk services including:
//! - Error types and handling
//! - Configuration management
//! - Embedding and completion provider clients
//! - Metrics and observability

pub mod completion;
pub mod config;
pub mod embeddings;
pub mod errors;
pub mod metrics;

// Re-export commonly used types
pub use completion::ChatCompleter;
pub use config::{AppConfig, MergePrecedence, RankingConfig};
pub use embeddings::Embedder;
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Default completion model
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-4o-mini";
