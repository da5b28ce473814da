//! Device session entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Lifecycle state of a device session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "session_state", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Tokens bound to this session validate.
    Active,
    /// Tokens bound to this session fail with `session_inactive`.
    Terminated,
}

/// Why a session was terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "termination_reason", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The device logged out.
    Logout,
    /// Displaced by a newer session under the per-subject cap.
    ConcurrentLimitExceeded,
    /// Revoked by an operator.
    Revoked,
    /// Refresh window lapsed.
    Expired,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Logout => "logout",
            Self::ConcurrentLimitExceeded => "concurrent_limit_exceeded",
            Self::Revoked => "revoked",
            Self::Expired => "expired",
        };
        write!(f, "{s}")
    }
}

/// A device session.
///
/// Sessions are created on login and terminated on logout, expiry, or
/// displacement. Tokens are signed bearer credentials; the session row is
/// the revocation authority their validity is checked against.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DeviceSession {
    /// Unique session identifier; embedded in every token as `sid`.
    pub id: Uuid,
    /// The authenticated device or account this session belongs to.
    pub subject_id: String,
    /// Device identifier presented at login.
    pub device_id: Option<String>,
    /// Client address captured at creation.
    pub remote_addr: String,
    /// User-Agent header captured at creation.
    pub user_agent: Option<String>,
    /// Current state.
    pub state: SessionState,
    /// Why the session was terminated, if it was.
    pub termination_reason: Option<TerminationReason>,
    /// When the current access token expires.
    pub access_expires_at: DateTime<Utc>,
    /// When the refresh token expires (never extended).
    pub refresh_expires_at: DateTime<Utc>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Last validated activity.
    pub last_activity: DateTime<Utc>,
    /// When the session was terminated.
    pub terminated_at: Option<DateTime<Utc>>,
}

impl DeviceSession {
    /// Whether tokens bound to this session should still validate.
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }
}

/// Data required to create a new session row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSession {
    /// Pre-generated session identifier (also embedded in the tokens).
    pub id: Uuid,
    /// The authenticated subject.
    pub subject_id: String,
    /// Device identifier.
    pub device_id: Option<String>,
    /// Client address.
    pub remote_addr: String,
    /// User-Agent header.
    pub user_agent: Option<String>,
    /// Access token expiry.
    pub access_expires_at: DateTime<Utc>,
    /// Refresh token expiry.
    pub refresh_expires_at: DateTime<Utc>,
}

/// Session view returned by the list operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session identifier.
    pub session_id: Uuid,
    /// Device identifier.
    pub device_id: Option<String>,
    /// Client address at creation.
    pub remote_addr: String,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Last validated activity.
    pub last_activity: DateTime<Utc>,
}

impl From<&DeviceSession> for SessionSummary {
    fn from(s: &DeviceSession) -> Self {
        Self {
            session_id: s.id,
            device_id: s.device_id.clone(),
            remote_addr: s.remote_addr.clone(),
            created_at: s.created_at,
            last_activity: s.last_activity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn termination_reason_wire_strings() {
        assert_eq!(
            serde_json::to_string(&TerminationReason::ConcurrentLimitExceeded).unwrap(),
            "\"concurrent_limit_exceeded\""
        );
        assert_eq!(TerminationReason::Expired.to_string(), "expired");
    }

    #[test]
    fn active_predicate_follows_state() {
        let now = Utc::now();
        let mut session = DeviceSession {
            id: Uuid::new_v4(),
            subject_id: "device-1".to_string(),
            device_id: None,
            remote_addr: "10.0.0.1".to_string(),
            user_agent: None,
            state: SessionState::Active,
            termination_reason: None,
            access_expires_at: now,
            refresh_expires_at: now,
            created_at: now,
            last_activity: now,
            terminated_at: None,
        };
        assert!(session.is_active());

        session.state = SessionState::Terminated;
        assert!(!session.is_active());
    }
}
