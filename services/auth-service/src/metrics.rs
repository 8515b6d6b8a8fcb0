//! Prometheus metrics exposition
//!
//! - `auth_requests_total` (counter): labels `endpoint`, `status`
//! - `auth_request_duration_seconds` (histogram): label `endpoint`
//! - `auth_token_validations_total` (counter): label `result`
//!
//! `auth_session_revocations_total` and `auth_session_rotations_total` are
//! emitted by the token service itself.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

const DURATION_METRIC: &str = "auth_request_duration_seconds";

/// Bucket boundaries from 1ms to 5s. Argon2 verification dominates login
/// latency; store calls are bounded by `store_timeout_ms`.
const DURATION_BUCKETS: &[f64] = &[
    0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(DURATION_METRIC.to_string()), DURATION_BUCKETS)
}

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// The duration metric gets explicit buckets so it renders as a histogram
/// (with `_bucket` lines) rather than the default summary.
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    Ok(builder()?.install_recorder()?)
}

/// Record a completed request.
pub fn record_request(endpoint: &str, status: u16, duration_secs: f64) {
    metrics::counter!(
        "auth_requests_total",
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(DURATION_METRIC, "endpoint" => endpoint.to_string()).record(duration_secs);
}

/// Record the outcome of a ValidateToken call: `valid` or the failure's wire string.
pub fn record_validation(result: &str) {
    metrics::counter!("auth_token_validations_total", "result" => result.to_string())
        .increment(1);
}

/// Middleware recording count and latency per matched route.
///
/// Unmatched paths share the `unmatched` label so scanners cannot blow up
/// label cardinality.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let start = Instant::now();

    let response = next.run(request).await;

    record_request(
        &endpoint,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}
