//! Engine call metrics.

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Engine calls by endpoint and HTTP status (`error` when no status).
    pub const REQUESTS_TOTAL: &str = "vsight_engine_requests_total";

    /// Engine failures that surface as server errors, by reason.
    pub const FAILURES_TOTAL: &str = "vsight_engine_failures_total";

    /// Engine call latency in seconds by endpoint.
    pub const LATENCY_SECONDS: &str = "vsight_engine_latency_seconds";
}

/// Record a completed engine call.
pub fn record_request(endpoint: &str, status: Option<u16>, latency_secs: f64) {
    let status = status.map_or_else(|| "error".to_string(), |s| s.to_string());

    counter!(
        names::REQUESTS_TOTAL,
        "endpoint" => endpoint.to_string(),
        "status" => status
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "endpoint" => endpoint.to_string()
    )
    .record(latency_secs);
}

/// Record an engine failure.
pub fn record_failure(reason: &'static str) {
    counter!(names::FAILURES_TOTAL, "reason" => reason).increment(1);
}
