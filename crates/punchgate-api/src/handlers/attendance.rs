//! Attendance ingestion handlers — clock, batch, status, pending.

use axum::Json;
use axum::extract::{Path, State};
use tracing::{debug, warn};
use validator::Validate;

use punchgate_core::error::AppError;
use punchgate_core::types::ApiEnvelope;
use punchgate_entity::attendance::{AttendanceEvent, fingerprint};
use punchgate_entity::queue::QueueState;

use crate::dto::request::{BatchRequest, ClockRequest};
use crate::dto::response::{
    BatchCounts, BatchRecordResult, BatchResponse, ClockResponse, PendingResponse, QueueEntryView,
    RecordStatus,
};
use crate::extractors::AuthDevice;
use crate::state::AppState;

/// How many pending records the pending view returns at most.
const PENDING_VIEW_LIMIT: i64 = 100;

/// Internal result of ingesting one record.
struct IngestOutcome {
    record_id: String,
    status: RecordStatus,
    error: Option<String>,
}

/// POST /attendance/clock
pub async fn clock(
    State(state): State<AppState>,
    device: AuthDevice,
    Json(req): Json<ClockRequest>,
) -> Result<Json<ApiEnvelope<ClockResponse>>, AppError> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let event = req.into_event();
    debug!(
        subject = %device.subject_id,
        employee = %event.employee_id,
        kind = %event.kind,
        "Clock submission"
    );

    let outcome = ingest_one(&state, event, None, false).await?;

    Ok(Json(ApiEnvelope::success(ClockResponse {
        record_id: outcome.record_id,
        synced: outcome.status == RecordStatus::Synced,
        queued: outcome.status == RecordStatus::Queued,
        duplicate: outcome.status == RecordStatus::Duplicate,
        error: outcome.error,
    })))
}

/// POST /attendance/batch
///
/// The whole batch is never rejected on partial failure; every record
/// carries its own result.
pub async fn batch(
    State(state): State<AppState>,
    device: AuthDevice,
    Json(req): Json<BatchRequest>,
) -> Result<Json<ApiEnvelope<BatchResponse>>, AppError> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    debug!(
        subject = %device.subject_id,
        records = req.records.len(),
        batch_id = req.batch_id.as_deref().unwrap_or("-"),
        offline = req.offline_sync,
        "Batch submission"
    );

    let mut results = Vec::with_capacity(req.records.len());
    let mut counts = BatchCounts::default();

    for (index, record) in req.records.into_iter().enumerate() {
        if let Err(e) = record.validate() {
            counts.error += 1;
            results.push(BatchRecordResult {
                index,
                record_id: None,
                status: RecordStatus::Error,
                error: Some(e.to_string()),
            });
            continue;
        }

        let event = record.into_event();
        match ingest_one(&state, event, req.batch_id.as_deref(), req.offline_sync).await {
            Ok(outcome) => {
                match outcome.status {
                    RecordStatus::Synced => counts.synced += 1,
                    RecordStatus::Queued => counts.queued += 1,
                    RecordStatus::Duplicate => counts.duplicate += 1,
                    RecordStatus::Error => counts.error += 1,
                }
                results.push(BatchRecordResult {
                    index,
                    record_id: Some(outcome.record_id),
                    status: outcome.status,
                    error: outcome.error,
                });
            }
            Err(e) => {
                // Local storage failure for this record only.
                warn!(index, error = %e, "Batch record failed to persist");
                counts.error += 1;
                results.push(BatchRecordResult {
                    index,
                    record_id: None,
                    status: RecordStatus::Error,
                    error: Some(e.message.clone()),
                });
            }
        }
    }

    Ok(Json(ApiEnvelope::success(BatchResponse {
        batch_id: req.batch_id,
        results,
        counts,
    })))
}

/// GET /attendance/status/{record_id}
pub async fn status(
    State(state): State<AppState>,
    _device: AuthDevice,
    Path(record_id): Path<String>,
) -> Result<Json<ApiEnvelope<QueueEntryView>>, AppError> {
    let entry = state
        .queue_repo
        .lookup(&record_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Record {record_id} not found")))?;

    Ok(Json(ApiEnvelope::success(QueueEntryView::from(&entry))))
}

/// GET /attendance/pending
pub async fn pending(
    State(state): State<AppState>,
    _device: AuthDevice,
) -> Result<Json<ApiEnvelope<PendingResponse>>, AppError> {
    let stats = state.queue_repo.stats().await?;
    let records = state
        .queue_repo
        .list_pending(PENDING_VIEW_LIMIT)
        .await?
        .iter()
        .map(QueueEntryView::from)
        .collect();

    Ok(Json(ApiEnvelope::success(PendingResponse {
        stats,
        records,
    })))
}

/// Ingest one validated event.
///
/// Best-effort synchronous path: the event is accepted as long as the local
/// queue can persist it; upstream unavailability only downgrades the result
/// from `synced` to `queued`. Local storage failure is the one error that
/// propagates.
async fn ingest_one(
    state: &AppState,
    event: AttendanceEvent,
    batch_id: Option<&str>,
    offline: bool,
) -> Result<IngestOutcome, AppError> {
    let record_id = fingerprint(&event);

    if let Some(existing) = state.queue_repo.lookup(&record_id).await? {
        let status = match existing.state {
            QueueState::Synced => RecordStatus::Duplicate,
            // Pending or terminal: the record is already in the pipeline.
            _ => RecordStatus::Queued,
        };
        return Ok(IngestOutcome {
            record_id,
            status,
            error: None,
        });
    }

    let enqueued = state
        .queue_repo
        .enqueue(&event, &record_id, batch_id)
        .await?;

    if !enqueued.created {
        // Lost an enqueue race; the other writer owns delivery.
        let status = match enqueued.entry.state {
            QueueState::Synced => RecordStatus::Duplicate,
            _ => RecordStatus::Queued,
        };
        return Ok(IngestOutcome {
            record_id,
            status,
            error: None,
        });
    }

    if offline {
        return Ok(IngestOutcome {
            record_id,
            status: RecordStatus::Queued,
            error: None,
        });
    }

    // One synchronous attempt. The handler is the sole holder of this
    // freshly inserted entry until mark_synced; a failure leaves it pending
    // with its attempt budget untouched for the forwarder.
    let outcome = state.upstream.submit_one(&event).await;
    if outcome.success {
        state.queue_repo.mark_synced(enqueued.entry.id).await?;
        return Ok(IngestOutcome {
            record_id,
            status: RecordStatus::Synced,
            error: None,
        });
    }

    Ok(IngestOutcome {
        record_id,
        status: RecordStatus::Queued,
        error: outcome.error,
    })
}
