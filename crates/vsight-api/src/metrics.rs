//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "vsight_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vsight_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "vsight_http_requests_in_flight";

    // Pipeline metrics
    pub const ANALYSES_TOTAL: &str = "vsight_analyses_total";
    pub const PIPELINE_REJECTIONS_TOTAL: &str = "vsight_pipeline_rejections_total";
    pub const TAMPERING_DECISIONS_TOTAL: &str = "vsight_tampering_decisions_total";
    pub const BACKGROUND_FAILURES_TOTAL: &str = "vsight_background_failures_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "vsight_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a completed analysis.
pub fn record_analysis(kind: &str, summary: &str) {
    let labels = [("kind", kind.to_string()), ("summary", summary.to_string())];
    counter!(names::ANALYSES_TOTAL, &labels).increment(1);
}

/// Record a request stopped by a pipeline stage.
pub fn record_rejection(stage: &'static str) {
    counter!(names::PIPELINE_REJECTIONS_TOTAL, "stage" => stage).increment(1);
}

pub fn record_tampering_decision(decision: &'static str) {
    counter!(names::TAMPERING_DECISIONS_TOTAL, "decision" => decision).increment(1);
}

pub fn record_background_failure(task: &'static str) {
    counter!(names::BACKGROUND_FAILURES_TOTAL, "task" => task).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Sanitize path for metrics labels (replace view ids).
fn sanitize_path(path: &str) -> String {
    let mut segments: Vec<&str> = path.split('/').collect();
    for i in 1..segments.len() {
        if segments[i - 1] == "views" && !segments[i].is_empty() {
            segments[i] = ":view_id";
        }
    }
    segments.join("/")
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    // Increment in-flight counter
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    // Decrement in-flight counter
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
