//! `AuthDevice` extractor — pulls the bearer token from the Authorization
//! header, validates it against the session authority, and injects the
//! authenticated context.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use punchgate_auth::TokenKind;
use punchgate_core::error::AppError;

use crate::state::AppState;

/// Authenticated device context available in handlers.
///
/// Extraction fails with 401 for missing/malformed credentials, expired or
/// retired-key tokens, and tokens bound to a terminated session.
#[derive(Debug, Clone)]
pub struct AuthDevice {
    /// The authenticated subject.
    pub subject_id: String,
    /// Device bound to the session.
    pub device_id: Option<String>,
    /// The session the presented token is bound to.
    pub session_id: Uuid,
}

impl FromRequestParts<AppState> for AuthDevice {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("Invalid Authorization header format"))?;

        // Signature + expiry + kind, then the session binding. Touches
        // session activity on success.
        let claims = state.authority.validate(token, TokenKind::Access).await?;

        Ok(AuthDevice {
            subject_id: claims.sub,
            device_id: claims.did,
            session_id: claims.sid,
        })
    }
}
