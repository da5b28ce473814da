//! Background forwarder configuration.

use serde::{Deserialize, Serialize};

/// Forwarder drain-loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwarderConfig {
    /// Whether the forwarder runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds between drain cycles.
    #[serde(default = "default_sync_interval")]
    pub sync_interval_seconds: u64,
    /// Maximum entries claimed per cycle.
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
    /// Delivery attempts before an entry is failed terminally.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i32,
    /// Age in days at which synced entries become prunable.
    #[serde(default = "default_retention")]
    pub retention_days: u32,
}

fn default_true() -> bool {
    true
}

fn default_sync_interval() -> u64 {
    30
}

fn default_batch_size() -> i64 {
    20
}

fn default_max_attempts() -> i32 {
    3
}

fn default_retention() -> u32 {
    30
}
