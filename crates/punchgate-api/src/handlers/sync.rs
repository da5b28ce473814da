//! Forwarder control handlers.

use axum::Json;
use axum::extract::{Path, State};

use punchgate_core::error::AppError;
use punchgate_core::types::ApiEnvelope;
use punchgate_entity::queue::QueueState;
use punchgate_forwarder::{DrainSummary, SyncConfigUpdate};

use crate::dto::request::TriggerRequest;
use crate::dto::response::{
    BatchCounts, BatchStatusResponse, CleanupResponse, QueueEntryView, RetryResponse,
    SyncStatusResponse,
};
use crate::extractors::AuthDevice;
use crate::state::AppState;

/// POST /sync/trigger
///
/// With explicit ids, force-syncs exactly those entries (bypassing the
/// attempt cap); otherwise runs one normal drain cycle now.
pub async fn trigger(
    State(state): State<AppState>,
    _device: AuthDevice,
    body: Option<Json<TriggerRequest>>,
) -> Result<Json<ApiEnvelope<DrainSummary>>, AppError> {
    let ids = body.map(|Json(req)| req.ids).unwrap_or_default();

    let summary = if ids.is_empty() {
        state.forwarder.drain_once().await?
    } else {
        state.forwarder.force_sync(&ids).await?
    };

    Ok(Json(ApiEnvelope::success(summary)))
}

/// POST /sync/retry
pub async fn retry(
    State(state): State<AppState>,
    _device: AuthDevice,
) -> Result<Json<ApiEnvelope<RetryResponse>>, AppError> {
    let (reset, summary) = state.forwarder.retry_failed().await?;

    Ok(Json(ApiEnvelope::success(RetryResponse { reset, summary })))
}

/// POST /sync/cleanup
pub async fn cleanup(
    State(state): State<AppState>,
    _device: AuthDevice,
) -> Result<Json<ApiEnvelope<CleanupResponse>>, AppError> {
    let pruned = state.forwarder.prune().await?;

    Ok(Json(ApiEnvelope::success(CleanupResponse { pruned })))
}

/// PUT /sync/config
pub async fn update_config(
    State(state): State<AppState>,
    _device: AuthDevice,
    Json(update): Json<SyncConfigUpdate>,
) -> Result<Json<ApiEnvelope<SyncStatusResponse>>, AppError> {
    state.forwarder.update_config(update).await?;
    status_response(&state).await.map(Json)
}

/// GET /sync/status
pub async fn status(
    State(state): State<AppState>,
    _device: AuthDevice,
) -> Result<Json<ApiEnvelope<SyncStatusResponse>>, AppError> {
    status_response(&state).await.map(Json)
}

/// GET /sync/batch/{id}
pub async fn batch_status(
    State(state): State<AppState>,
    _device: AuthDevice,
    Path(batch_id): Path<String>,
) -> Result<Json<ApiEnvelope<BatchStatusResponse>>, AppError> {
    let entries = state.queue_repo.find_by_batch(&batch_id).await?;
    if entries.is_empty() {
        return Err(AppError::not_found(format!("Batch {batch_id} not found")));
    }

    let mut counts = BatchCounts::default();
    for entry in &entries {
        match entry.state {
            QueueState::Synced => counts.synced += 1,
            QueueState::Pending => counts.queued += 1,
            QueueState::FailedTerminal => counts.error += 1,
        }
    }

    let records = entries.iter().map(QueueEntryView::from).collect();

    Ok(Json(ApiEnvelope::success(BatchStatusResponse {
        batch_id,
        records,
        counts,
    })))
}

async fn status_response(state: &AppState) -> Result<ApiEnvelope<SyncStatusResponse>, AppError> {
    let forwarder = state.forwarder.status().await;
    let queue = state.queue_repo.stats().await?;

    Ok(ApiEnvelope::success(SyncStatusResponse {
        forwarder,
        queue,
    }))
}
