//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with standardized naming conventions.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all RFPDesk metrics
pub const METRICS_PREFIX: &str = "rfpdesk";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001, // 1ms
    0.005, // 5ms
    0.010, // 10ms
    0.025, // 25ms
    0.050, // 50ms
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
    10.00, // 10s
];

/// Buckets for provider latency (embedding/completion, typically slower)
pub const PROVIDER_BUCKETS: &[f64] = &[
    0.050, // 50ms
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.000, // 2s
    5.000, // 5s
    10.00, // 10s
    30.00, // 30s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Search metrics
    describe_counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of search queries"
    );

    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Search query latency in seconds"
    );

    // Chat metrics
    describe_counter!(
        format!("{}_chat_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of chat queries"
    );

    describe_counter!(
        format!("{}_chat_fallbacks_total", METRICS_PREFIX),
        Unit::Count,
        "Chat answers replaced by the quality gate"
    );

    describe_histogram!(
        format!("{}_chat_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Chat query latency in seconds"
    );

    // Provider metrics
    describe_counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding API requests"
    );

    describe_counter!(
        format!("{}_embedding_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding API errors"
    );

    describe_histogram!(
        format!("{}_embedding_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Embedding generation latency in seconds"
    );

    describe_counter!(
        format!("{}_completion_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total completion API requests"
    );

    describe_counter!(
        format!("{}_completion_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total completion API errors"
    );

    describe_histogram!(
        format!("{}_completion_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Completion latency in seconds"
    );

    // Corpus metrics
    describe_gauge!(
        format!("{}_corpus_records", METRICS_PREFIX),
        Unit::Count,
        "Number of records in the loaded corpus"
    );

    describe_counter!(
        format!("{}_corpus_loads_total", METRICS_PREFIX),
        Unit::Count,
        "Total corpus load/reload operations"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record one search query
pub fn record_search(duration_secs: f64, result_count: usize) {
    counter!(format!("{}_search_queries_total", METRICS_PREFIX)).increment(1);
    histogram!(format!("{}_search_duration_seconds", METRICS_PREFIX)).record(duration_secs);
    gauge!(format!("{}_search_results_count", METRICS_PREFIX)).set(result_count as f64);
}

/// Record one chat query; `fell_back` marks gate-replaced answers
pub fn record_chat(duration_secs: f64, fell_back: bool) {
    counter!(format!("{}_chat_queries_total", METRICS_PREFIX)).increment(1);
    if fell_back {
        counter!(format!("{}_chat_fallbacks_total", METRICS_PREFIX)).increment(1);
    }
    histogram!(format!("{}_chat_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Record a corpus load and its size
pub fn record_corpus_load(record_count: usize) {
    counter!(format!("{}_corpus_loads_total", METRICS_PREFIX)).increment(1);
    gauge!(format!("{}_corpus_records", METRICS_PREFIX)).set(record_count as f64);
}
