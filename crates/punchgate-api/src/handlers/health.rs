//! Health check handler.

use axum::Json;
use axum::extract::State;

use punchgate_core::types::ApiEnvelope;

use crate::dto::response::HealthResponse;
use crate::state::AppState;

/// GET /health — liveness plus a database ping. Unauthenticated.
pub async fn health(State(state): State<AppState>) -> Json<ApiEnvelope<HealthResponse>> {
    let database = match sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db_pool)
        .await
    {
        Ok(_) => "ok",
        Err(_) => "unreachable",
    };

    Json(ApiEnvelope::success(HealthResponse {
        status: if database == "ok" { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
    }))
}
