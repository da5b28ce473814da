//! Session persistence operations wrapping the database repository.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use punchgate_core::config::AuthConfig;
use punchgate_core::error::AppError;
use punchgate_database::repositories::SessionRepository;
use punchgate_entity::session::{CreateSession, DeviceSession, TerminationReason};

/// Abstracts session persistence operations.
#[derive(Debug, Clone)]
pub struct SessionStore {
    /// Session database repository.
    repo: Arc<SessionRepository>,
    /// Days terminated sessions are retained before cleanup.
    retention_days: i64,
}

impl SessionStore {
    /// Creates a new session store.
    pub fn new(repo: Arc<SessionRepository>, config: &AuthConfig) -> Self {
        Self {
            repo,
            retention_days: config.session_retention_days as i64,
        }
    }

    /// Creates a new session record in the database.
    pub async fn create_session(&self, data: &CreateSession) -> Result<DeviceSession, AppError> {
        self.repo.create(data).await
    }

    /// Finds a session by ID.
    pub async fn find_by_id(&self, session_id: Uuid) -> Result<Option<DeviceSession>, AppError> {
        self.repo.find_by_id(session_id).await
    }

    /// Finds all active sessions for a subject, newest first.
    pub async fn find_active_by_subject(
        &self,
        subject_id: &str,
    ) -> Result<Vec<DeviceSession>, AppError> {
        self.repo.find_active_by_subject(subject_id).await
    }

    /// Counts active sessions for a subject.
    pub async fn count_active_by_subject(&self, subject_id: &str) -> Result<i64, AppError> {
        self.repo.count_active_by_subject(subject_id).await
    }

    /// Terminates all but the newest `keep` active sessions of a subject.
    pub async fn terminate_overflow(
        &self,
        subject_id: &str,
        keep: i64,
        reason: TerminationReason,
    ) -> Result<u64, AppError> {
        self.repo.terminate_overflow(subject_id, keep, reason).await
    }

    /// Marks a session as terminated. Returns false when it was not active.
    pub async fn terminate_session(
        &self,
        session_id: Uuid,
        reason: TerminationReason,
    ) -> Result<bool, AppError> {
        self.repo.terminate(session_id, reason).await
    }

    /// Updates the session's last-activity timestamp.
    pub async fn touch_activity(&self, session_id: Uuid) -> Result<(), AppError> {
        self.repo.touch_activity(session_id).await
    }

    /// Records the expiry of a freshly minted access token.
    pub async fn update_access_expiry(
        &self,
        session_id: Uuid,
        access_expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.repo
            .update_access_expiry(session_id, access_expires_at)
            .await
    }

    /// Terminates sessions whose refresh window has lapsed.
    pub async fn terminate_expired(&self) -> Result<u64, AppError> {
        self.repo.terminate_expired(Utc::now()).await
    }

    /// Deletes terminated sessions past the retention window.
    pub async fn cleanup(&self) -> Result<u64, AppError> {
        let cutoff = Utc::now() - Duration::days(self.retention_days);
        self.repo.cleanup(cutoff).await
    }
}
