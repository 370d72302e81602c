//! Metrics and observability utilities
//!
//! Prometheus metric descriptions and recording helpers with a shared
//! naming prefix. Recording is a no-op until an exporter is installed.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all SentAI metrics
pub const METRICS_PREFIX: &str = "sentai";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
];

/// Buckets for text generation latency, bounded by the 20s call timeout
pub const ANALYSIS_BUCKETS: &[f64] = &[
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.000,  // 2s
    5.000,  // 5s
    10.00,  // 10s
    20.00,  // 20s
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

    // Ingestion metrics
    describe_counter!(
        format!("{}_reviews_ingested_total", METRICS_PREFIX),
        Unit::Count,
        "Reviews inserted by batch ingestion"
    );

    describe_counter!(
        format!("{}_rows_rejected_total", METRICS_PREFIX),
        Unit::Count,
        "Uploaded rows rejected by validation"
    );

    describe_counter!(
        format!("{}_chunks_failed_total", METRICS_PREFIX),
        Unit::Count,
        "Ingestion chunks aborted by a storage error"
    );

    // Analysis metrics
    describe_counter!(
        format!("{}_analysis_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Text generation calls by dimension and outcome"
    );

    describe_histogram!(
        format!("{}_analysis_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Text generation latency in seconds"
    );

    // Recommendation cache metrics
    describe_counter!(
        format!("{}_recommendation_cache_hits_total", METRICS_PREFIX),
        Unit::Count,
        "Recommendations served from storage"
    );

    describe_counter!(
        format!("{}_recommendation_cache_misses_total", METRICS_PREFIX),
        Unit::Count,
        "Recommendations generated on request"
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

/// Helper to record one ingestion run
pub fn record_ingestion(inserted: usize, rejected: usize, failed_chunks: usize) {
    counter!(format!("{}_reviews_ingested_total", METRICS_PREFIX)).increment(inserted as u64);
    counter!(format!("{}_rows_rejected_total", METRICS_PREFIX)).increment(rejected as u64);
    counter!(format!("{}_chunks_failed_total", METRICS_PREFIX)).increment(failed_chunks as u64);
}

/// Helper to record one text generation call
pub fn record_analysis(duration_secs: f64, dimension: &str, model: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_analysis_requests_total", METRICS_PREFIX),
        "dimension" => dimension.to_string(),
        "model" => model.to_string(),
        "status" => status
    )
    .increment(1);

    histogram!(
        format!("{}_analysis_duration_seconds", METRICS_PREFIX),
        "dimension" => dimension.to_string()
    )
    .record(duration_secs);
}

/// Helper to record recommendation cache lookups
pub fn record_recommendation_cache(hit: bool, kind: &str) {
    let name = if hit { "hits" } else { "misses" };
    counter!(
        format!("{}_recommendation_cache_{}_total", METRICS_PREFIX, name),
        "kind" => kind.to_string()
    )
    .increment(1);
}
