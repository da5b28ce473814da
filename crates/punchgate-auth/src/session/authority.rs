//! Session authority — issue, validate, refresh, and revoke device sessions.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use punchgate_core::config::AuthConfig;
use punchgate_core::error::AppError;
use punchgate_entity::session::{
    CreateSession, DeviceSession, SessionSummary, TerminationReason,
};

use crate::jwt::encoder::TokenPair;
use crate::jwt::{Claims, TokenDecoder, TokenEncoder, TokenKind};

use super::store::SessionStore;

/// Result of issuing a new session.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IssuedSession {
    /// Generated token pair.
    pub tokens: TokenPair,
    /// The created session identifier.
    pub session_id: Uuid,
    /// Access token TTL in seconds.
    pub access_ttl_seconds: u64,
}

/// Issues, validates, refreshes, and revokes device sessions.
///
/// Tokens are signed bearer credentials, so signature verification alone
/// would be stateless; the session row is what makes "log out", "rotate on
/// compromise", and the concurrent-session cap enforceable. Validation
/// checks the token's session binding, not the token itself against a
/// blocklist, so authority state is O(sessions).
#[derive(Debug, Clone)]
pub struct SessionAuthority {
    /// Token minting.
    encoder: Arc<TokenEncoder>,
    /// Token verification.
    decoder: Arc<TokenDecoder>,
    /// Session persistence.
    store: Arc<SessionStore>,
    /// Maximum active sessions per subject.
    max_concurrent_sessions: i64,
    /// Fleet provisioning key devices present at login.
    device_key: String,
}

impl SessionAuthority {
    /// Creates a new session authority.
    pub fn new(
        encoder: Arc<TokenEncoder>,
        decoder: Arc<TokenDecoder>,
        store: Arc<SessionStore>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            encoder,
            decoder,
            store,
            max_concurrent_sessions: config.max_concurrent_sessions as i64,
            device_key: config.device_key.clone(),
        }
    }

    /// Checks the fleet provisioning key presented at login.
    pub fn verify_device_key(&self, presented: &str) -> Result<(), AppError> {
        if presented != self.device_key {
            return Err(AppError::authentication("Invalid device key"));
        }
        Ok(())
    }

    /// Issues a new session and token pair for an authenticated subject.
    ///
    /// When the subject exceeds the concurrent-session cap, the oldest
    /// active sessions are terminated with reason
    /// `concurrent_limit_exceeded`, which invalidates their tokens.
    pub async fn issue(
        &self,
        subject_id: &str,
        device_id: Option<&str>,
        remote_addr: &str,
        user_agent: Option<&str>,
    ) -> Result<IssuedSession, AppError> {
        let session_id = Uuid::new_v4();
        let tokens = self
            .encoder
            .generate_token_pair(subject_id, device_id, session_id)?;

        let session = self
            .store
            .create_session(&CreateSession {
                id: session_id,
                subject_id: subject_id.to_string(),
                device_id: device_id.map(String::from),
                remote_addr: remote_addr.to_string(),
                user_agent: user_agent.map(String::from),
                access_expires_at: tokens.access_expires_at,
                refresh_expires_at: tokens.refresh_expires_at,
            })
            .await?;

        let displaced = self
            .store
            .terminate_overflow(
                subject_id,
                self.max_concurrent_sessions,
                TerminationReason::ConcurrentLimitExceeded,
            )
            .await?;

        if displaced > 0 {
            warn!(
                subject_id = %subject_id,
                displaced,
                "Concurrent session limit reached, oldest sessions terminated"
            );
        }

        info!(
            subject_id = %subject_id,
            session_id = %session.id,
            "Session issued"
        );

        Ok(IssuedSession {
            tokens,
            session_id: session.id,
            access_ttl_seconds: self.encoder.access_ttl_seconds(),
        })
    }

    /// Validates a token of the given kind and touches session activity.
    ///
    /// Fails with `session_inactive` for tokens bound to a terminated
    /// session, regardless of signature validity.
    pub async fn validate(&self, token: &str, kind: TokenKind) -> Result<Claims, AppError> {
        let claims = match kind {
            TokenKind::Access => self.decoder.decode_access_token(token)?,
            TokenKind::Refresh => self.decoder.decode_refresh_token(token)?,
        };

        let session = self.require_active_session(claims.sid).await?;

        self.store.touch_activity(session.id).await?;

        Ok(claims)
    }

    /// Mints a new access token from a valid refresh token.
    ///
    /// The refresh expiry is never extended; when it lapses the device must
    /// log in again.
    pub async fn refresh(&self, refresh_token: &str) -> Result<(String, u64), AppError> {
        let claims = self.decoder.decode_refresh_token(refresh_token)?;
        let session = self.require_active_session(claims.sid).await?;

        let (access_token, access_expires_at) =
            self.encoder
                .generate_access_token(&claims.sub, claims.did.as_deref(), session.id)?;

        self.store
            .update_access_expiry(session.id, access_expires_at)
            .await?;
        self.store.touch_activity(session.id).await?;

        info!(session_id = %session.id, "Access token refreshed");

        Ok((access_token, self.encoder.access_ttl_seconds()))
    }

    /// Terminates a session. Subsequent validation of any token bound to it
    /// fails with `session_inactive`.
    pub async fn terminate(
        &self,
        session_id: Uuid,
        reason: TerminationReason,
    ) -> Result<(), AppError> {
        let terminated = self.store.terminate_session(session_id, reason).await?;
        if !terminated {
            return Err(AppError::not_found(format!(
                "Active session {session_id} not found"
            )));
        }

        info!(session_id = %session_id, reason = %reason, "Session terminated");
        Ok(())
    }

    /// Enumerates the subject's currently-active sessions.
    pub async fn list(&self, subject_id: &str) -> Result<Vec<SessionSummary>, AppError> {
        let sessions = self.store.find_active_by_subject(subject_id).await?;
        Ok(sessions.iter().map(SessionSummary::from).collect())
    }

    /// Terminates sessions past their refresh window and deletes terminated
    /// rows past retention. Returns (expired, deleted).
    pub async fn sweep(&self) -> Result<(u64, u64), AppError> {
        let expired = self.store.terminate_expired().await?;
        let deleted = self.store.cleanup().await?;
        Ok((expired, deleted))
    }

    async fn require_active_session(&self, session_id: Uuid) -> Result<DeviceSession, AppError> {
        let session = self
            .store
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| AppError::session_inactive("Session not found"))?;

        if !session.is_active() {
            return Err(AppError::session_inactive("Session has been terminated"));
        }

        if session.refresh_expires_at <= Utc::now() {
            // Lapsed but not yet swept; terminate on sight.
            let _ = self
                .store
                .terminate_session(session.id, TerminationReason::Expired)
                .await;
            return Err(AppError::session_inactive("Session has expired"));
        }

        Ok(session)
    }
}
