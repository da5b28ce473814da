//! Per-client rate limiting for the ingestion routes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tokio::sync::Mutex;

use punchgate_core::config::RateLimitConfig;
use punchgate_core::error::AppError;

use crate::state::AppState;

/// Buckets idle for longer than this are dropped during a sweep.
const BUCKET_IDLE_EVICT: Duration = Duration::from_secs(300);

/// Map size that triggers an eviction sweep. Device fleets are bounded;
/// crossing this usually means clients without a forwarded address are
/// being keyed individually.
const SWEEP_THRESHOLD: usize = 4096;

/// In-memory request budget per client key.
///
/// Each client accrues allowance at `per_second` up to `burst`; a request
/// spends one unit. Stale buckets are evicted once the map grows past the
/// sweep threshold, so long-running gateways don't accumulate state for
/// devices that have left the fleet.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    buckets: Arc<Mutex<HashMap<String, Bucket>>>,
    burst: f64,
    per_second: f64,
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    allowance: f64,
    touched: Instant,
}

impl RateLimiter {
    /// Creates a new rate limiter.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            burst: config.burst as f64,
            per_second: config.per_second,
        }
    }

    /// Spends one unit of the client's budget. Returns false when the
    /// client is over its budget.
    pub async fn check(&self, key: &str) -> bool {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();

        if buckets.len() >= SWEEP_THRESHOLD {
            buckets.retain(|_, b| now.duration_since(b.touched) < BUCKET_IDLE_EVICT);
        }

        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            allowance: self.burst,
            touched: now,
        });

        let idle = now.duration_since(bucket.touched).as_secs_f64();
        bucket.allowance = self.burst.min(bucket.allowance + idle * self.per_second);
        bucket.touched = now;

        if bucket.allowance < 1.0 {
            return false;
        }
        bucket.allowance -= 1.0;
        true
    }
}

/// Middleware enforcing the per-client ingestion budget.
pub async fn ingest_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let key = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    if !state.rate_limiter.check(&key).await {
        return AppError::rate_limit("Ingestion rate limit exceeded").into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(burst: u32, per_second: f64) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig { burst, per_second })
    }

    #[tokio::test]
    async fn burst_is_bounded() {
        let limiter = limiter(3, 0.0);

        assert!(limiter.check("10.0.0.1").await);
        assert!(limiter.check("10.0.0.1").await);
        assert!(limiter.check("10.0.0.1").await);
        assert!(!limiter.check("10.0.0.1").await);
    }

    #[tokio::test]
    async fn clients_have_independent_budgets() {
        let limiter = limiter(1, 0.0);

        assert!(limiter.check("10.0.0.1").await);
        assert!(!limiter.check("10.0.0.1").await);
        assert!(limiter.check("10.0.0.2").await);
    }

    #[tokio::test]
    async fn allowance_accrues_while_idle() {
        let limiter = limiter(1, 1000.0);

        assert!(limiter.check("10.0.0.1").await);
        // At 1000 units/s even a few milliseconds restore the budget.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(limiter.check("10.0.0.1").await);
    }
}
