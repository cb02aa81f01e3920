//! # Request Metrics
//!
//! Counts requests and records their latency through the `metrics`
//! facade. Without an installed recorder the calls are no-ops.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;

const HTTP_REQUESTS_TOTAL: &str = "famlink_http_requests_total";
const HTTP_REQUEST_DURATION: &str = "famlink_http_request_duration_seconds";

/// Labels requests by matched route template, so path parameters do not
/// create one series per account.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let method = request.method().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    metrics::counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.clone(),
        "route" => route.clone(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!(HTTP_REQUEST_DURATION, "method" => method, "route" => route)
        .record(started.elapsed().as_secs_f64());

    response
}
