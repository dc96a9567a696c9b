//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all YaMDb metrics
pub const METRICS_PREFIX: &str = "yamdb";

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
];

/// Register all metric descriptions
pub fn register_metrics() {
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

    describe_counter!(
        format!("{}_signups_total", METRICS_PREFIX),
        Unit::Count,
        "Signup requests by outcome"
    );

    describe_counter!(
        format!("{}_tokens_issued_total", METRICS_PREFIX),
        Unit::Count,
        "Access tokens issued"
    );

    describe_counter!(
        format!("{}_reviews_created_total", METRICS_PREFIX),
        Unit::Count,
        "Reviews created"
    );

    describe_counter!(
        format!("{}_comments_created_total", METRICS_PREFIX),
        Unit::Count,
        "Comments created"
    );

    describe_counter!(
        format!("{}_rows_imported_total", METRICS_PREFIX),
        Unit::Count,
        "Rows written by the CSV importer"
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

/// `outcome` is one of created, resent
pub fn record_signup(outcome: &'static str) {
    counter!(
        format!("{}_signups_total", METRICS_PREFIX),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_token_issued() {
    counter!(format!("{}_tokens_issued_total", METRICS_PREFIX)).increment(1);
}

pub fn record_review_created() {
    counter!(format!("{}_reviews_created_total", METRICS_PREFIX)).increment(1);
}

pub fn record_comment_created() {
    counter!(format!("{}_comments_created_total", METRICS_PREFIX)).increment(1);
}

pub fn record_import(entity: &'static str, rows: usize) {
    counter!(
        format!("{}_rows_imported_total", METRICS_PREFIX),
        "entity" => entity
    )
    .increment(rows as u64);
}
