//! Token and session configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shipped default for secrets; flagged at startup when left in place.
pub(crate) const PLACEHOLDER_SECRET: &str = "CHANGE_ME_IN_PRODUCTION";

/// Session authority configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for JWT signing (HMAC-SHA256).
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// The retired signing secret, accepted during the rotation grace window.
    #[serde(default)]
    pub previous_jwt_secret: Option<String>,
    /// When the current secret replaced the previous one.
    #[serde(default)]
    pub key_rotated_at: Option<DateTime<Utc>>,
    /// Days after `key_rotated_at` during which previous-secret tokens are
    /// still accepted. 0 disables the grace window.
    #[serde(default)]
    pub key_grace_days: u32,
    /// Access token TTL in minutes.
    #[serde(default = "default_access_ttl")]
    pub access_ttl_minutes: u64,
    /// Refresh token TTL in days.
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_days: u64,
    /// Maximum active sessions per subject.
    #[serde(default = "default_max_sessions")]
    pub max_concurrent_sessions: u32,
    /// Fleet provisioning key devices present at login.
    #[serde(default = "default_device_key")]
    pub device_key: String,
    /// Days after which terminated/expired session rows are deleted.
    #[serde(default = "default_session_retention")]
    pub session_retention_days: u32,
}

fn default_jwt_secret() -> String {
    PLACEHOLDER_SECRET.to_string()
}

fn default_access_ttl() -> u64 {
    15
}

fn default_refresh_ttl() -> u64 {
    7
}

fn default_max_sessions() -> u32 {
    5
}

fn default_device_key() -> String {
    PLACEHOLDER_SECRET.to_string()
}

fn default_session_retention() -> u32 {
    7
}
