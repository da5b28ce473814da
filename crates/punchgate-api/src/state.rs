//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use sqlx::PgPool;

use punchgate_auth::SessionAuthority;
use punchgate_core::config::AppConfig;
use punchgate_database::repositories::QueueRepository;
use punchgate_forwarder::Forwarder;
use punchgate_upstream::ErpClient;

use crate::middleware::rate_limit::RateLimiter;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`. All fields are
/// `Arc`-wrapped for cheap cloning across tasks; each is constructed once
/// at startup and owned by the service root.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// PostgreSQL connection pool.
    pub db_pool: PgPool,
    /// Durable attendance queue.
    pub queue_repo: Arc<QueueRepository>,
    /// Session/token authority.
    pub authority: Arc<SessionAuthority>,
    /// Upstream ERP client (shared pacing budget).
    pub upstream: Arc<ErpClient>,
    /// Background forwarder and its control surface.
    pub forwarder: Arc<Forwarder>,
    /// Inbound per-IP rate limiter.
    pub rate_limiter: RateLimiter,
}
