//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod app;
pub mod auth;
pub mod database;
pub mod forwarder;
pub mod logging;
pub mod upstream;

use serde::{Deserialize, Serialize};

pub use self::app::{CorsConfig, RateLimitConfig, ServerConfig};
pub use self::auth::AuthConfig;
pub use self::database::DatabaseConfig;
pub use self::forwarder::ForwarderConfig;
pub use self::logging::LoggingConfig;
pub use self::upstream::UpstreamConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// Token and session settings.
    pub auth: AuthConfig,
    /// Upstream ERP client settings.
    pub upstream: UpstreamConfig,
    /// Background forwarder settings.
    pub forwarder: ForwarderConfig,
    /// Inbound rate limiting settings.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `PUNCHGATE`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("PUNCHGATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Warn about placeholder secrets that must not reach production.
    ///
    /// Call after logging is initialized; loading happens before that.
    pub fn warn_insecure_defaults(&self) {
        if self.auth.jwt_secret == auth::PLACEHOLDER_SECRET {
            tracing::warn!("auth.jwt_secret is the placeholder value; issued tokens are forgeable");
        }
        if self.auth.device_key == auth::PLACEHOLDER_SECRET {
            tracing::warn!("auth.device_key is the placeholder value; any device can enroll");
        }
    }
}
