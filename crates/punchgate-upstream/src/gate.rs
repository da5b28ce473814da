//! Dispatch pacing for upstream calls.
//!
//! Three constraints apply to every outbound request, shared by all
//! callers: a cap on in-flight requests, a token reservoir bounding the
//! request rate per window, and a minimum spacing between dispatches.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};

use punchgate_core::config::UpstreamConfig;
use punchgate_core::error::AppError;

/// Mutable pacing state behind the gate's mutex.
#[derive(Debug)]
struct ReservoirState {
    /// Tokens currently available.
    tokens: f64,
    /// When tokens were last refilled.
    last_refill: Instant,
    /// When a request was last dispatched.
    last_dispatch: Option<Instant>,
}

/// Gate every upstream dispatch passes through.
#[derive(Debug, Clone)]
pub struct DispatchGate {
    /// In-flight request cap.
    semaphore: Arc<Semaphore>,
    /// Reservoir and spacing state.
    state: Arc<Mutex<ReservoirState>>,
    /// Reservoir capacity.
    capacity: f64,
    /// Tokens restored per second.
    refill_per_second: f64,
    /// Minimum gap between dispatches.
    min_spacing: Duration,
}

/// Held for the duration of one upstream request; releasing it frees an
/// in-flight slot.
#[derive(Debug)]
pub struct DispatchPermit {
    _permit: OwnedSemaphorePermit,
}

impl DispatchGate {
    /// Creates a gate from upstream configuration.
    pub fn new(config: &UpstreamConfig) -> Self {
        let window = config.reservoir_window_seconds.max(1) as f64;
        Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrent as usize)),
            state: Arc::new(Mutex::new(ReservoirState {
                tokens: config.reservoir as f64,
                last_refill: Instant::now(),
                last_dispatch: None,
            })),
            capacity: config.reservoir as f64,
            refill_per_second: config.reservoir_refresh as f64 / window,
            min_spacing: Duration::from_millis(config.min_spacing_ms),
        }
    }

    /// Waits for an in-flight slot, a reservoir token, and the spacing
    /// floor, then returns a permit for one dispatch.
    pub async fn acquire(&self) -> Result<DispatchPermit, AppError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AppError::internal("Upstream dispatch gate closed"))?;

        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();

                let elapsed = now.duration_since(state.last_refill).as_secs_f64();
                state.tokens = refill(state.tokens, elapsed, self.refill_per_second, self.capacity);
                state.last_refill = now;

                let token_wait = if state.tokens >= 1.0 {
                    Duration::ZERO
                } else {
                    Duration::from_secs_f64((1.0 - state.tokens) / self.refill_per_second)
                };

                let spacing_wait = match state.last_dispatch {
                    Some(last) => self.min_spacing.saturating_sub(now.duration_since(last)),
                    None => Duration::ZERO,
                };

                let wait = token_wait.max(spacing_wait);
                if wait.is_zero() {
                    state.tokens -= 1.0;
                    state.last_dispatch = Some(now);
                }
                wait
            };

            if wait.is_zero() {
                return Ok(DispatchPermit { _permit: permit });
            }

            tokio::time::sleep(wait).await;
        }
    }
}

/// Continuous reservoir refill, capped at capacity.
fn refill(tokens: f64, elapsed_seconds: f64, rate_per_second: f64, capacity: f64) -> f64 {
    (tokens + elapsed_seconds * rate_per_second).min(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(reservoir: u32, max_concurrent: u32, min_spacing_ms: u64) -> UpstreamConfig {
        serde_json::from_value(serde_json::json!({
            "base_url": "https://erp.example.com",
            "reservoir": reservoir,
            "reservoir_refresh": reservoir,
            "reservoir_window_seconds": 60,
            "max_concurrent": max_concurrent,
            "min_spacing_ms": min_spacing_ms,
        }))
        .unwrap()
    }

    #[test]
    fn refill_is_capped_at_capacity() {
        assert_eq!(refill(99.5, 3600.0, 100.0 / 60.0, 100.0), 100.0);
    }

    #[test]
    fn refill_accumulates_linearly() {
        // 100 tokens per 60 s window: 30 s restores 50 tokens.
        let restored = refill(0.0, 30.0, 100.0 / 60.0, 100.0);
        assert!((restored - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn acquire_consumes_tokens() {
        let gate = DispatchGate::new(&config(10, 3, 0));
        for _ in 0..3 {
            gate.acquire().await.unwrap();
        }
        let state = gate.state.lock().await;
        assert!(state.tokens < 8.0 + 1e-6);
    }

    #[tokio::test]
    async fn min_spacing_separates_dispatches() {
        let gate = DispatchGate::new(&config(100, 3, 20));

        let start = Instant::now();
        gate.acquire().await.unwrap();
        gate.acquire().await.unwrap();
        gate.acquire().await.unwrap();

        // Three dispatches need at least two spacing gaps.
        assert!(start.elapsed() >= Duration::from_millis(40));
    }
}
