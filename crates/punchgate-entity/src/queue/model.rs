//! Queue entry entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

use super::state::QueueState;
use crate::attendance::AttendanceEvent;

/// A persisted attendance record awaiting (or past) delivery.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QueueEntry {
    /// Monotone identifier assigned on insert.
    pub id: i64,
    /// Deterministic event identity; unique across the queue.
    pub fingerprint: String,
    /// Denormalized employee identifier for operator queries.
    pub employee_id: String,
    /// The full event payload.
    pub event: Json<AttendanceEvent>,
    /// Optional grouping tag assigned at batch ingestion.
    pub batch_id: Option<String>,
    /// Current delivery state.
    pub state: QueueState,
    /// Delivery attempts consumed so far.
    pub attempts: i32,
    /// Error from the most recent failed attempt.
    pub last_error: Option<String>,
    /// When the current forwarder claim was taken; cleared by `mark_*`.
    pub claimed_at: Option<DateTime<Utc>>,
    /// When the entry was first accepted.
    pub first_seen_at: DateTime<Utc>,
    /// When delivery was last attempted.
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// When the upstream accepted the record.
    pub synced_at: Option<DateTime<Utc>>,
}

/// Result of an enqueue call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueOutcome {
    /// The entry holding this fingerprint.
    pub entry: QueueEntry,
    /// Whether the call inserted a new row (false: fingerprint already known).
    pub created: bool,
}

/// Queue totals by state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueStats {
    /// Entries awaiting delivery.
    pub pending: i64,
    /// Entries accepted upstream.
    pub synced: i64,
    /// Entries out of retry budget.
    pub failed_terminal: i64,
}
