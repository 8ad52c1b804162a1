//! RFPDesk retrieval core
//!
//! Answers free-text questions against a fixed Q/A corpus by combining
//! three retrieval strategies:
//! - Lexical (exact substring) matching
//! - Fuzzy (approximate string) matching
//! - Semantic (embedding similarity) ranking
//!
//! Matcher outputs are fused into one ranked candidate list, serialized
//! into a bounded context block, handed to a completion provider, and the
//! resulting draft is passed through a quality gate that guarantees a
//! non-empty, non-refusal answer whenever the corpus has anything to say.

pub mod context;
pub mod corpus;
pub mod fusion;
pub mod gate;
pub mod matchers;
pub mod service;
pub mod similarity;
pub mod synth;

// Re-export the main entry points
pub use corpus::{source_from_config, Corpus, CorpusSource, CorpusStore, Record};
pub use fusion::{merge, RankedRecord};
pub use gate::{AnswerGate, GatedAnswer, NO_ANSWER_MESSAGE};
pub use matchers::{MatchSource, ScoredMatch};
pub use service::{GroupedMatches, MatchSummary, QaService};
pub use similarity::cosine_similarity;
