//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use punchgate_entity::queue::{QueueEntry, QueueState, QueueStats};
use punchgate_entity::session::SessionSummary;
use punchgate_forwarder::{DrainSummary, ForwarderStatus};

/// Outcome of a single clock submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockResponse {
    /// The record identity; use it with `GET /attendance/status/{record_id}`.
    pub record_id: String,
    /// Accepted by the upstream during this request.
    pub synced: bool,
    /// Held in the durable queue for background delivery.
    pub queued: bool,
    /// This logical event was already known.
    pub duplicate: bool,
    /// Why the synchronous upstream attempt failed, when it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-record result inside a batch response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRecordResult {
    /// Position in the submitted batch.
    pub index: usize,
    /// Record identity, when the record was accepted at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    /// `synced`, `queued`, `duplicate`, or `error`.
    pub status: RecordStatus,
    /// Failure detail for `error` records or failed sync attempts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Classification of one record's ingestion outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Accepted upstream during the request.
    Synced,
    /// Held for background delivery.
    Queued,
    /// Already known.
    Duplicate,
    /// Rejected (validation or local storage failure).
    Error,
}

/// Aggregate counts for a batch response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchCounts {
    /// Records accepted upstream.
    pub synced: usize,
    /// Records queued for later delivery.
    pub queued: usize,
    /// Records already known.
    pub duplicate: usize,
    /// Records rejected.
    pub error: usize,
}

/// Batch submission response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponse {
    /// Batch tag, when one was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    /// Per-record outcomes, in input order.
    pub results: Vec<BatchRecordResult>,
    /// Aggregate counts.
    pub counts: BatchCounts,
}

/// Queue entry view exposed over the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntryView {
    /// Queue row id.
    pub id: i64,
    /// Record identity (fingerprint or client-supplied id).
    pub record_id: String,
    /// Employee the record belongs to.
    pub employee_id: String,
    /// Delivery state.
    pub state: QueueState,
    /// Delivery attempts consumed.
    pub attempts: i32,
    /// Most recent delivery error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Batch tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    /// When the record was first accepted.
    pub first_seen_at: DateTime<Utc>,
    /// When delivery was last attempted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// When the upstream accepted the record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<DateTime<Utc>>,
}

impl From<&QueueEntry> for QueueEntryView {
    fn from(entry: &QueueEntry) -> Self {
        Self {
            id: entry.id,
            record_id: entry.fingerprint.clone(),
            employee_id: entry.employee_id.clone(),
            state: entry.state,
            attempts: entry.attempts,
            last_error: entry.last_error.clone(),
            batch_id: entry.batch_id.clone(),
            first_seen_at: entry.first_seen_at,
            last_attempt_at: entry.last_attempt_at,
            synced_at: entry.synced_at,
        }
    }
}

/// `GET /attendance/pending` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingResponse {
    /// Queue totals by state.
    pub stats: QueueStats,
    /// Oldest pending records.
    pub records: Vec<QueueEntryView>,
}

/// `GET /sync/status` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatusResponse {
    /// Forwarder state and settings.
    pub forwarder: ForwarderStatus,
    /// Queue totals by state.
    pub queue: QueueStats,
}

/// `POST /sync/retry` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryResponse {
    /// Terminal entries reset to pending.
    pub reset: u64,
    /// Summary of the drain that followed.
    pub summary: DrainSummary,
}

/// `POST /sync/cleanup` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupResponse {
    /// Synced entries deleted.
    pub pruned: u64,
}

/// `GET /sync/batch/{id}` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStatusResponse {
    /// The batch tag.
    pub batch_id: String,
    /// Entries ingested under the tag.
    pub records: Vec<QueueEntryView>,
    /// Totals by state for this batch.
    pub counts: BatchCounts,
}

/// Login response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Short-lived access token.
    pub access_token: String,
    /// Long-lived refresh token.
    pub refresh_token: String,
    /// The session both tokens are bound to.
    pub session_id: Uuid,
    /// Access token TTL in seconds.
    pub access_ttl_seconds: u64,
    /// Access token expiry.
    pub access_expires_at: DateTime<Utc>,
    /// Refresh token expiry.
    pub refresh_expires_at: DateTime<Utc>,
}

/// Refresh response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// New access token, bound to the same session.
    pub access_token: String,
    /// Access token TTL in seconds.
    pub access_ttl_seconds: u64,
}

/// `GET /auth/verify` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    /// Authenticated subject.
    pub subject_id: String,
    /// Device bound to the session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Session identifier.
    pub session_id: Uuid,
    /// The subject's currently-active sessions.
    pub sessions: Vec<SessionSummary>,
}

/// Simple message response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Message.
    pub message: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Database reachability.
    pub database: String,
}
