//! Per-request tracing.
//!
//! Every request runs inside an `info` span named `request`. The status and
//! latency are recorded on the span once the response is ready, and one event
//! is emitted at `info` (or `warn` for server errors).

use std::time::Instant;

use http::{Method, StatusCode};
use tracing::{Span, field, info, info_span, warn};

pub fn request_span(method: &Method, path: &str) -> Span {
    info_span!(
        "request",
        method = %method,
        path = %path,
        status = field::Empty,
        latency_ms = field::Empty,
    )
}

/// Records the outcome on `span` and logs the request line.
pub fn finish(span: &Span, status: StatusCode, started: Instant) {
    let latency_ms = started.elapsed().as_millis() as u64;
    span.record("status", status.as_u16());
    span.record("latency_ms", latency_ms);
    if status.is_server_error() {
        warn!(parent: span, status = status.as_u16(), latency_ms, "request served");
    } else {
        info!(parent: span, status = status.as_u16(), latency_ms, "request served");
    }
}
