//! Request logging middleware.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Logs one line per request, leveled by outcome: server errors at error,
/// client errors at warn, health probes at debug, everything else at info.
pub async fn request_logging(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let elapsed_ms = start.elapsed().as_millis() as u64;

    if status >= 500 {
        error!(%method, %path, status, elapsed_ms, "request failed");
    } else if status >= 400 {
        warn!(%method, %path, status, elapsed_ms, "request rejected");
    } else if path == "/health" {
        debug!(%method, %path, status, elapsed_ms, "request");
    } else {
        info!(%method, %path, status, elapsed_ms, "request");
    }

    response
}
