//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with latency histograms and
//! standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Moto Registry metrics
pub const METRICS_PREFIX: &str = "moto_registry";

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

    // Intake metrics
    describe_counter!(
        format!("{}_reports_submitted_total", METRICS_PREFIX),
        Unit::Count,
        "Total theft reports submitted"
    );

    describe_counter!(
        format!("{}_images_stored_total", METRICS_PREFIX),
        Unit::Count,
        "Total bike images persisted to storage"
    );

    describe_histogram!(
        format!("{}_report_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Report submission latency in seconds"
    );

    // Lookup metrics
    describe_counter!(
        format!("{}_searches_total", METRICS_PREFIX),
        Unit::Count,
        "Total identifier lookups"
    );

    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Identifier lookup latency in seconds"
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

/// Record a completed report submission
pub fn record_report_submitted(duration_secs: f64, image_count: usize) {
    counter!(format!("{}_reports_submitted_total", METRICS_PREFIX)).increment(1);

    if image_count > 0 {
        counter!(format!("{}_images_stored_total", METRICS_PREFIX))
            .increment(image_count as u64);
    }

    histogram!(format!("{}_report_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Record a completed identifier lookup
pub fn record_search(duration_secs: f64, identifier: &str, found: bool) {
    counter!(
        format!("{}_searches_total", METRICS_PREFIX),
        "identifier" => identifier.to_string(),
        "found" => found.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        "identifier" => identifier.to_string()
    )
    .record(duration_secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets_sorted() {
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_request_metrics() {
        let metrics = RequestMetrics::start("POST", "/api/bikes/report");
        std::thread::sleep(std::time::Duration::from_millis(10));
        metrics.finish(201);
        // Just verify it runs without panic
    }
}
