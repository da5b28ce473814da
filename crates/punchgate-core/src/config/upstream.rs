//! Upstream ERP client configuration.

use serde::{Deserialize, Serialize};

/// Connection, pacing, and retry settings for the upstream ERP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the ERP instance.
    pub base_url: String,
    /// API key for the `token {key}:{secret}` auth header.
    #[serde(default)]
    pub api_key: String,
    /// API secret for the `token {key}:{secret}` auth header.
    #[serde(default)]
    pub api_secret: String,
    /// Per-request deadline in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Retries per call for recoverable failures.
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    /// Base delay for exponential backoff, in milliseconds.
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,
    /// Maximum in-flight requests.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: u32,
    /// Rate reservoir capacity.
    #[serde(default = "default_reservoir")]
    pub reservoir: u32,
    /// Tokens restored to the reservoir per window.
    #[serde(default = "default_reservoir")]
    pub reservoir_refresh: u32,
    /// Reservoir refill window in seconds.
    #[serde(default = "default_reservoir_window")]
    pub reservoir_window_seconds: u64,
    /// Minimum spacing between dispatched requests, in milliseconds.
    #[serde(default = "default_min_spacing")]
    pub min_spacing_ms: u64,
    /// Records per slice when submitting batches.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Pause between batch slices, in milliseconds.
    #[serde(default = "default_batch_delay")]
    pub batch_delay_ms: u64,
}

fn default_timeout() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay() -> u64 {
    1000
}

fn default_max_concurrent() -> u32 {
    3
}

fn default_reservoir() -> u32 {
    100
}

fn default_reservoir_window() -> u64 {
    60
}

fn default_min_spacing() -> u64 {
    300
}

fn default_batch_size() -> usize {
    10
}

fn default_batch_delay() -> u64 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg: UpstreamConfig =
            serde_json::from_value(serde_json::json!({"base_url": "https://erp.example.com"}))
                .unwrap();

        assert_eq!(cfg.timeout_seconds, 30);
        assert_eq!(cfg.retry_count, 3);
        assert_eq!(cfg.max_concurrent, 3);
        assert_eq!(cfg.reservoir, 100);
        assert_eq!(cfg.min_spacing_ms, 300);
        assert_eq!(cfg.batch_size, 10);
    }
}
