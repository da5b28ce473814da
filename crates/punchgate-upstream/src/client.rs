//! Upstream ERP HTTP client.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, EXPECT, HeaderMap, HeaderValue};
use tracing::{debug, warn};

use punchgate_core::config::UpstreamConfig;
use punchgate_core::error::AppError;
use punchgate_entity::attendance::AttendanceEvent;

use crate::gate::DispatchGate;
use crate::types::{CheckinRecord, SubmitOutcome};

/// Client for the upstream ERP checkin API.
///
/// The upstream is the bottleneck and the only failure surface of the
/// pipeline; concurrency, rate, spacing, and retry policy are all enforced
/// here so callers can treat it as a single shared resource.
#[derive(Debug, Clone)]
pub struct ErpClient {
    http: reqwest::Client,
    checkin_url: String,
    gate: DispatchGate,
    retry_count: u32,
    retry_base_delay: Duration,
    batch_size: usize,
    batch_delay: Duration,
}

impl ErpClient {
    /// Create a new ERP client.
    pub fn new(config: &UpstreamConfig) -> Result<Self, AppError> {
        if config.base_url.is_empty() {
            return Err(AppError::configuration("upstream.base_url is empty"));
        }

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!(
            "token {}:{}",
            config.api_key, config.api_secret
        ))
        .map_err(|_| AppError::configuration("Invalid upstream API credentials"))?;
        headers.insert(AUTHORIZATION, auth);
        // Some proxies answer 417 to Expect: 100-continue; make sure the
        // header is never sent.
        headers.insert(EXPECT, HeaderValue::from_static(""));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::with_source(
                    punchgate_core::error::ErrorKind::Configuration,
                    format!("Failed to build upstream HTTP client: {e}"),
                    e,
                )
            })?;

        let checkin_url = format!(
            "{}/api/resource/Employee%20Checkin",
            config.base_url.trim_end_matches('/')
        );

        Ok(Self {
            http,
            checkin_url,
            gate: DispatchGate::new(config),
            retry_count: config.retry_count,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
            batch_size: config.batch_size.max(1),
            batch_delay: Duration::from_millis(config.batch_delay_ms),
        })
    }

    /// Submit a single event. Delivery failure is captured in the outcome,
    /// never raised.
    pub async fn submit_one(&self, event: &AttendanceEvent) -> SubmitOutcome {
        let record = CheckinRecord::from_event(event);

        let mut attempt = 1u32;
        loop {
            let outcome = self.dispatch(&record).await;

            match &outcome {
                Ok(accepted) => return accepted.clone(),
                Err((retryable, failed)) => {
                    if *retryable && attempt <= self.retry_count {
                        let delay = self.retry_base_delay * 2u32.pow(attempt - 1);
                        warn!(
                            employee = %record.employee,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = failed.error.as_deref().unwrap_or("unknown"),
                            "Upstream call failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return failed.clone();
                }
            }
        }
    }

    /// Submit many events, returning one outcome per input in input order.
    ///
    /// Input is processed in slices of `batch_size`; slices are dispatched
    /// sequentially with `batch_delay` between them, and requests within a
    /// slice proceed concurrently under the shared gate.
    pub async fn submit_many(&self, events: &[AttendanceEvent]) -> Vec<SubmitOutcome> {
        let mut outcomes = Vec::with_capacity(events.len());

        let mut slices = events.chunks(self.batch_size).peekable();
        while let Some(slice) = slices.next() {
            let slice_outcomes =
                futures::future::join_all(slice.iter().map(|event| self.submit_one(event))).await;
            outcomes.extend(slice_outcomes);

            if slices.peek().is_some() && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        outcomes
    }

    /// One paced request. `Err` carries whether the failure is retryable
    /// plus the outcome to surface if the retry budget runs out.
    async fn dispatch(
        &self,
        record: &CheckinRecord,
    ) -> Result<SubmitOutcome, (bool, SubmitOutcome)> {
        let _permit = self.gate.acquire().await.map_err(|e| {
            (
                true,
                SubmitOutcome::failed(format!("Dispatch gate error: {e}"), None),
            )
        })?;

        let response = match self.http.post(&self.checkin_url).json(record).send().await {
            Ok(response) => response,
            Err(e) => {
                let reason = if e.is_timeout() {
                    "Upstream request timed out".to_string()
                } else {
                    format!("Upstream request failed: {e}")
                };
                return Err((true, SubmitOutcome::failed(reason, None)));
            }
        };

        let status = response.status();

        if status.is_success() {
            let data = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|body| body.get("data").cloned());
            debug!(employee = %record.employee, status = status.as_u16(), "Checkin accepted");
            return Ok(SubmitOutcome::accepted(data, status.as_u16()));
        }

        let body = response.text().await.unwrap_or_default();
        let message = format!(
            "Upstream returned {}: {}",
            status.as_u16(),
            truncate(&body, 500)
        );
        let outcome = SubmitOutcome::failed(message, Some(status.as_u16()));

        Err((is_retryable_status(status), outcome))
    }
}

/// Whether an HTTP failure status is worth retrying: server errors and the
/// proxy-induced 417. All other 4xx are terminal.
fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::EXPECTATION_FAILED
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_and_417_are_retryable() {
        assert!(is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable_status(StatusCode::EXPECTATION_FAILED));
    }

    #[test]
    fn other_client_errors_are_terminal() {
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(StatusCode::CONFLICT));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("ab", 3), "ab");
        assert_eq!(truncate("äöü", 2), "äö");
    }

    #[test]
    fn checkin_url_is_percent_encoded() {
        let config: punchgate_core::config::UpstreamConfig = serde_json::from_value(
            serde_json::json!({"base_url": "https://erp.example.com/"}),
        )
        .unwrap();
        let client = ErpClient::new(&config).unwrap();
        assert_eq!(
            client.checkin_url,
            "https://erp.example.com/api/resource/Employee%20Checkin"
        );
    }
}
