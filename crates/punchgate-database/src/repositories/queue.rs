//! Durable attendance queue repository.
//!
//! The queue is the sole shared mutable store of the ingestion pipeline.
//! Every state transition of a [`QueueEntry`] goes through this repository,
//! which serializes per-row updates at the database level.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use punchgate_core::error::{AppError, ErrorKind};
use punchgate_core::result::AppResult;
use punchgate_entity::attendance::AttendanceEvent;
use punchgate_entity::queue::{EnqueueOutcome, QueueEntry, QueueState, QueueStats};

/// A claimed entry is invisible to further claims for this long. A forwarder
/// that dies mid-cycle loses its claim after the window and the entry is
/// picked up again on a later cycle.
const IN_FLIGHT_RECLAIM_SECS: f64 = 600.0;

/// Outcome of a failed delivery attempt.
#[derive(Debug, Clone, Copy)]
pub struct MarkFailedOutcome {
    /// Attempts consumed after this failure.
    pub attempts: i32,
    /// Whether the entry was promoted to `failed_terminal`.
    pub terminal: bool,
}

/// Repository for queue CRUD and state-transition operations.
#[derive(Debug, Clone)]
pub struct QueueRepository {
    pool: PgPool,
}

impl QueueRepository {
    /// Create a new queue repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find an entry by its fingerprint.
    pub async fn lookup(&self, fingerprint: &str) -> AppResult<Option<QueueEntry>> {
        sqlx::query_as::<_, QueueEntry>("SELECT * FROM attendance_queue WHERE fingerprint = $1")
            .bind(fingerprint)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to look up queue entry", e)
            })
    }

    /// Find an entry by its row id.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<QueueEntry>> {
        sqlx::query_as::<_, QueueEntry>("SELECT * FROM attendance_queue WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find queue entry", e)
            })
    }

    /// Insert a pending entry for the event, or return the existing entry
    /// when the fingerprint is already known.
    ///
    /// The unique index on `fingerprint` makes the first insert win;
    /// replays observe `created = false`.
    pub async fn enqueue(
        &self,
        event: &AttendanceEvent,
        fingerprint: &str,
        batch_id: Option<&str>,
    ) -> AppResult<EnqueueOutcome> {
        let inserted = sqlx::query_as::<_, QueueEntry>(
            "INSERT INTO attendance_queue (fingerprint, employee_id, event, batch_id) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (fingerprint) DO NOTHING \
             RETURNING *",
        )
        .bind(fingerprint)
        .bind(&event.employee_id)
        .bind(Json(event))
        .bind(batch_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to enqueue event", e))?;

        if let Some(entry) = inserted {
            return Ok(EnqueueOutcome {
                entry,
                created: true,
            });
        }

        let existing = self.lookup(fingerprint).await?.ok_or_else(|| {
            AppError::database("Conflicting queue entry disappeared during enqueue")
        })?;

        Ok(EnqueueOutcome {
            entry: existing,
            created: false,
        })
    }

    /// Claim up to `limit` pending entries with remaining attempt budget,
    /// oldest first.
    ///
    /// The claim stamps `claimed_at` in the same statement that selects the
    /// rows (`FOR UPDATE SKIP LOCKED`), so concurrent claims never return
    /// the same entry. Claims not resolved by a `mark_*` call become
    /// reclaimable after the in-flight window.
    pub async fn claim(&self, limit: i64, max_attempts: i32) -> AppResult<Vec<QueueEntry>> {
        let mut entries = sqlx::query_as::<_, QueueEntry>(
            "UPDATE attendance_queue SET claimed_at = NOW() \
             WHERE id IN ( \
                SELECT id FROM attendance_queue \
                WHERE state = 'pending' AND attempts < $2 \
                AND (claimed_at IS NULL OR claimed_at < NOW() - make_interval(secs => $3)) \
                ORDER BY first_seen_at ASC \
                FOR UPDATE SKIP LOCKED \
                LIMIT $1 \
             ) RETURNING *",
        )
        .bind(limit)
        .bind(max_attempts)
        .bind(IN_FLIGHT_RECLAIM_SECS)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to claim entries", e))?;

        // UPDATE ... RETURNING does not preserve the subquery ordering.
        entries.sort_by_key(|e| e.first_seen_at);
        Ok(entries)
    }

    /// Claim exactly the listed entries, ignoring attempt budget and
    /// terminal-failure state (operator force-sync). Synced entries are
    /// never re-claimed.
    pub async fn claim_by_ids(&self, ids: &[i64]) -> AppResult<Vec<QueueEntry>> {
        let mut entries = sqlx::query_as::<_, QueueEntry>(
            "UPDATE attendance_queue \
             SET claimed_at = NOW(), state = 'pending' \
             WHERE id = ANY($1) AND state <> 'synced' \
             RETURNING *",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to claim entries by id", e)
        })?;

        entries.sort_by_key(|e| e.first_seen_at);
        Ok(entries)
    }

    /// Transition an entry from `pending` to `synced`.
    ///
    /// A repeated call on an already-synced entry is a no-op; any other
    /// source state is a conflict.
    pub async fn mark_synced(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE attendance_queue \
             SET state = 'synced', synced_at = NOW(), claimed_at = NULL \
             WHERE id = $1 AND state = 'pending'",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark entry synced", e))?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        let state: Option<QueueState> =
            sqlx::query_scalar("SELECT state FROM attendance_queue WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to read entry state", e)
                })?;

        match state {
            Some(QueueState::Synced) => Ok(()),
            Some(other) => Err(AppError::conflict(format!(
                "Cannot mark entry {id} synced from state {other}"
            ))),
            None => Err(AppError::not_found(format!("Queue entry {id} not found"))),
        }
    }

    /// Record a failed delivery attempt.
    ///
    /// Increments `attempts`, stores the error, clears the claim, and
    /// promotes the entry to `failed_terminal` exactly when the attempt
    /// budget is exhausted — all in one statement.
    pub async fn mark_failed(
        &self,
        id: i64,
        error: &str,
        max_attempts: i32,
    ) -> AppResult<MarkFailedOutcome> {
        let row: Option<(i32, QueueState)> = sqlx::query_as(
            "UPDATE attendance_queue \
             SET attempts = attempts + 1, \
                 last_error = $2, \
                 last_attempt_at = NOW(), \
                 claimed_at = NULL, \
                 state = CASE WHEN attempts + 1 >= $3 \
                         THEN 'failed_terminal'::queue_state \
                         ELSE 'pending'::queue_state END \
             WHERE id = $1 AND state = 'pending' \
             RETURNING attempts, state",
        )
        .bind(id)
        .bind(error)
        .bind(max_attempts)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark entry failed", e))?;

        let (attempts, state) = row.ok_or_else(|| {
            AppError::conflict(format!("Cannot mark entry {id} failed: not pending"))
        })?;

        Ok(MarkFailedOutcome {
            attempts,
            terminal: state == QueueState::FailedTerminal,
        })
    }

    /// Move every `failed_terminal` entry back to `pending` with a fresh
    /// attempt budget. Returns how many entries were reset.
    pub async fn reset_terminal(&self) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE attendance_queue \
             SET state = 'pending', attempts = 0, last_error = NULL, claimed_at = NULL \
             WHERE state = 'failed_terminal'",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to reset terminal entries", e)
        })?;

        Ok(result.rows_affected())
    }

    /// Delete synced entries older than the cutoff. Returns how many rows
    /// were pruned.
    pub async fn prune(&self, older_than: DateTime<Utc>) -> AppResult<u64> {
        let result =
            sqlx::query("DELETE FROM attendance_queue WHERE state = 'synced' AND synced_at < $1")
                .bind(older_than)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to prune synced entries", e)
                })?;

        Ok(result.rows_affected())
    }

    /// Queue totals by state.
    pub async fn stats(&self) -> AppResult<QueueStats> {
        let pending = self.count_state(QueueState::Pending).await?;
        let synced = self.count_state(QueueState::Synced).await?;
        let failed_terminal = self.count_state(QueueState::FailedTerminal).await?;

        Ok(QueueStats {
            pending,
            synced,
            failed_terminal,
        })
    }

    /// Oldest-first pending entries, for the operator pending view.
    pub async fn list_pending(&self, limit: i64) -> AppResult<Vec<QueueEntry>> {
        sqlx::query_as::<_, QueueEntry>(
            "SELECT * FROM attendance_queue WHERE state = 'pending' \
             ORDER BY first_seen_at ASC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list pending entries", e)
        })
    }

    /// All entries ingested under a batch tag, oldest first.
    pub async fn find_by_batch(&self, batch_id: &str) -> AppResult<Vec<QueueEntry>> {
        sqlx::query_as::<_, QueueEntry>(
            "SELECT * FROM attendance_queue WHERE batch_id = $1 ORDER BY first_seen_at ASC",
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find batch entries", e)
        })
    }

    async fn count_state(&self, state: QueueState) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM attendance_queue WHERE state = $1")
            .bind(state)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count entries", e))
    }
}
