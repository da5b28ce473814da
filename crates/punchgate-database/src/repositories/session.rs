//! Device session repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use punchgate_core::error::{AppError, ErrorKind};
use punchgate_core::result::AppResult;
use punchgate_entity::session::{CreateSession, DeviceSession, TerminationReason};

/// Repository for session CRUD and lifecycle operations.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    /// Create a new session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new session row.
    pub async fn create(&self, data: &CreateSession) -> AppResult<DeviceSession> {
        sqlx::query_as::<_, DeviceSession>(
            "INSERT INTO device_sessions \
             (id, subject_id, device_id, remote_addr, user_agent, access_expires_at, refresh_expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(data.id)
        .bind(&data.subject_id)
        .bind(&data.device_id)
        .bind(&data.remote_addr)
        .bind(&data.user_agent)
        .bind(data.access_expires_at)
        .bind(data.refresh_expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create session", e))
    }

    /// Find a session by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<DeviceSession>> {
        sqlx::query_as::<_, DeviceSession>("SELECT * FROM device_sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find session", e))
    }

    /// List all active sessions for a subject, newest first.
    pub async fn find_active_by_subject(&self, subject_id: &str) -> AppResult<Vec<DeviceSession>> {
        sqlx::query_as::<_, DeviceSession>(
            "SELECT * FROM device_sessions \
             WHERE subject_id = $1 AND state = 'active' \
             ORDER BY created_at DESC",
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find active sessions", e)
        })
    }

    /// Count active sessions for a subject.
    pub async fn count_active_by_subject(&self, subject_id: &str) -> AppResult<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM device_sessions WHERE subject_id = $1 AND state = 'active'",
        )
        .bind(subject_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to count active sessions", e)
        })
    }

    /// Terminate a single session. Returns false when the session was not
    /// active (already terminated or unknown).
    pub async fn terminate(&self, id: Uuid, reason: TerminationReason) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE device_sessions \
             SET state = 'terminated', termination_reason = $2, terminated_at = NOW() \
             WHERE id = $1 AND state = 'active'",
        )
        .bind(id)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to terminate session", e))?;

        Ok(result.rows_affected() > 0)
    }

    /// Terminate every active session of a subject except the newest `keep`,
    /// in one atomic statement. Returns how many sessions were displaced.
    ///
    /// Row locks (`FOR UPDATE SKIP LOCKED`) make concurrent issue calls for
    /// the same subject converge instead of double-terminating.
    pub async fn terminate_overflow(
        &self,
        subject_id: &str,
        keep: i64,
        reason: TerminationReason,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE device_sessions \
             SET state = 'terminated', termination_reason = $3, terminated_at = NOW() \
             WHERE id IN ( \
                SELECT id FROM device_sessions \
                WHERE subject_id = $1 AND state = 'active' \
                ORDER BY created_at DESC \
                OFFSET $2 \
                FOR UPDATE SKIP LOCKED \
             )",
        )
        .bind(subject_id)
        .bind(keep)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to terminate overflow sessions", e)
        })?;

        Ok(result.rows_affected())
    }

    /// Update the last-activity timestamp.
    pub async fn touch_activity(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE device_sessions SET last_activity = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update last activity", e)
            })?;
        Ok(())
    }

    /// Record the expiry of a freshly minted access token.
    pub async fn update_access_expiry(
        &self,
        id: Uuid,
        access_expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query("UPDATE device_sessions SET access_expires_at = $2 WHERE id = $1")
            .bind(id)
            .bind(access_expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update access expiry", e)
            })?;
        Ok(())
    }

    /// Terminate active sessions whose refresh window has lapsed. Returns
    /// how many sessions expired.
    pub async fn terminate_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE device_sessions \
             SET state = 'terminated', termination_reason = 'expired', terminated_at = NOW() \
             WHERE state = 'active' AND refresh_expires_at < $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to expire sessions", e)
        })?;

        Ok(result.rows_affected())
    }

    /// Delete terminated sessions older than the cutoff.
    pub async fn cleanup(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM device_sessions WHERE state = 'terminated' AND terminated_at < $1",
        )
        .bind(before)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to cleanup sessions", e))?;

        Ok(result.rows_affected())
    }
}
