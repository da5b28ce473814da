//! JWT token validation with signing-key rotation support.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use punchgate_core::config::AuthConfig;
use punchgate_core::error::AppError;

use super::claims::{Claims, TokenKind};

/// Validates JWT tokens against the primary signing secret and, during a
/// rotation grace window, the previous secret.
///
/// Tokens signed with the previous secret are accepted until the window
/// closes; after that they fail with `needs_refresh` so devices re-login
/// instead of being told their token is malformed.
#[derive(Clone)]
pub struct TokenDecoder {
    /// Key for the current signing secret.
    primary_key: DecodingKey,
    /// Key for the retired secret, when one is configured.
    previous_key: Option<DecodingKey>,
    /// End of the rotation grace window.
    grace_until: Option<DateTime<Utc>>,
    /// Validation configuration.
    validation: Validation,
}

impl std::fmt::Debug for TokenDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenDecoder")
            .field("grace_until", &self.grace_until)
            .finish()
    }
}

impl TokenDecoder {
    /// Creates a new decoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 5; // 5 seconds leeway for clock skew

        let grace_until = match (&config.key_rotated_at, config.key_grace_days) {
            (Some(rotated_at), days) if days > 0 => {
                Some(*rotated_at + Duration::days(days as i64))
            }
            _ => None,
        };

        Self {
            primary_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            previous_key: config
                .previous_jwt_secret
                .as_ref()
                .map(|s| DecodingKey::from_secret(s.as_bytes())),
            grace_until,
            validation,
        }
    }

    /// Decodes and validates an access token string.
    pub fn decode_access_token(&self, token: &str) -> Result<Claims, AppError> {
        self.decode_kind(token, TokenKind::Access)
    }

    /// Decodes and validates a refresh token string.
    pub fn decode_refresh_token(&self, token: &str) -> Result<Claims, AppError> {
        self.decode_kind(token, TokenKind::Refresh)
    }

    fn decode_kind(&self, token: &str, expected: TokenKind) -> Result<Claims, AppError> {
        let claims = self.decode_token(token)?;

        if claims.kind != expected {
            let wanted = match expected {
                TokenKind::Access => "access",
                TokenKind::Refresh => "refresh",
            };
            return Err(AppError::unauthorized(format!(
                "Invalid token kind: expected {wanted} token"
            )));
        }

        Ok(claims)
    }

    /// Verifies the signature against the primary key, then the previous
    /// key. Previous-key tokens are only honored inside the grace window.
    fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        let primary_err = match decode::<Claims>(token, &self.primary_key, &self.validation) {
            Ok(data) => return Ok(data.claims),
            Err(e) => e,
        };

        // Only a signature mismatch is worth retrying with the old key;
        // expiry and malformed tokens fail the same way under any key.
        if !matches!(
            primary_err.kind(),
            jsonwebtoken::errors::ErrorKind::InvalidSignature
        ) {
            return Err(map_jwt_error(primary_err));
        }

        let Some(previous_key) = &self.previous_key else {
            return Err(map_jwt_error(primary_err));
        };

        match decode::<Claims>(token, previous_key, &self.validation) {
            Ok(data) => {
                let in_grace = self
                    .grace_until
                    .map(|until| Utc::now() < until)
                    .unwrap_or(false);

                if in_grace {
                    Ok(data.claims)
                } else {
                    Err(AppError::needs_refresh(
                        "Token signed with a retired key; re-authenticate",
                    ))
                }
            }
            Err(_) => Err(map_jwt_error(primary_err)),
        }
    }
}

fn map_jwt_error(e: jsonwebtoken::errors::Error) -> AppError {
    match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::unauthorized("Token has expired")
        }
        jsonwebtoken::errors::ErrorKind::InvalidToken => {
            AppError::unauthorized("Invalid token format")
        }
        jsonwebtoken::errors::ErrorKind::InvalidSignature => {
            AppError::unauthorized("Invalid token signature")
        }
        _ => AppError::unauthorized(format!("Token validation failed: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::encoder::TokenEncoder;
    use punchgate_core::error::ErrorKind;
    use uuid::Uuid;

    fn config(secret: &str) -> AuthConfig {
        serde_json::from_value::<AuthConfig>(serde_json::json!({ "jwt_secret": secret })).unwrap()
    }

    #[test]
    fn round_trips_access_and_refresh() {
        let cfg = config("test-secret");
        let encoder = TokenEncoder::new(&cfg);
        let decoder = TokenDecoder::new(&cfg);
        let sid = Uuid::new_v4();

        let pair = encoder
            .generate_token_pair("device-1", Some("TAB-7"), sid)
            .unwrap();

        let access = decoder.decode_access_token(&pair.access_token).unwrap();
        assert_eq!(access.sub, "device-1");
        assert_eq!(access.sid, sid);
        assert_eq!(access.kind, TokenKind::Access);

        let refresh = decoder.decode_refresh_token(&pair.refresh_token).unwrap();
        assert_eq!(refresh.kind, TokenKind::Refresh);
    }

    #[test]
    fn rejects_wrong_kind() {
        let cfg = config("test-secret");
        let encoder = TokenEncoder::new(&cfg);
        let decoder = TokenDecoder::new(&cfg);

        let pair = encoder
            .generate_token_pair("device-1", None, Uuid::new_v4())
            .unwrap();

        let err = decoder
            .decode_access_token(&pair.refresh_token)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }

    #[test]
    fn rejects_malformed_token() {
        let decoder = TokenDecoder::new(&config("test-secret"));
        let err = decoder.decode_access_token("not-a-jwt").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }

    #[test]
    fn rejects_foreign_signature() {
        let encoder = TokenEncoder::new(&config("other-secret"));
        let decoder = TokenDecoder::new(&config("test-secret"));

        let pair = encoder
            .generate_token_pair("device-1", None, Uuid::new_v4())
            .unwrap();

        let err = decoder.decode_access_token(&pair.access_token).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }

    #[test]
    fn previous_key_accepted_inside_grace_window() {
        let old_encoder = TokenEncoder::new(&config("old-secret"));
        let pair = old_encoder
            .generate_token_pair("device-1", None, Uuid::new_v4())
            .unwrap();

        let mut cfg = config("new-secret");
        cfg.previous_jwt_secret = Some("old-secret".to_string());
        cfg.key_rotated_at = Some(Utc::now() - Duration::days(1));
        cfg.key_grace_days = 3;

        let decoder = TokenDecoder::new(&cfg);
        let claims = decoder.decode_access_token(&pair.access_token).unwrap();
        assert_eq!(claims.sub, "device-1");
    }

    #[test]
    fn previous_key_rejected_after_grace_window() {
        let old_encoder = TokenEncoder::new(&config("old-secret"));
        let pair = old_encoder
            .generate_token_pair("device-1", None, Uuid::new_v4())
            .unwrap();

        let mut cfg = config("new-secret");
        cfg.previous_jwt_secret = Some("old-secret".to_string());
        cfg.key_rotated_at = Some(Utc::now() - Duration::days(10));
        cfg.key_grace_days = 3;

        let decoder = TokenDecoder::new(&cfg);
        let err = decoder.decode_access_token(&pair.access_token).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NeedsRefresh);
    }

    #[test]
    fn previous_key_rejected_when_grace_disabled() {
        let old_encoder = TokenEncoder::new(&config("old-secret"));
        let pair = old_encoder
            .generate_token_pair("device-1", None, Uuid::new_v4())
            .unwrap();

        let mut cfg = config("new-secret");
        cfg.previous_jwt_secret = Some("old-secret".to_string());
        // key_grace_days defaults to 0 — grace disabled.

        let decoder = TokenDecoder::new(&cfg);
        let err = decoder.decode_access_token(&pair.access_token).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NeedsRefresh);
    }
}
