//! The response envelope used by every API endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Standard response envelope.
///
/// Every endpoint, success or failure, wraps its payload in this shape so
/// device firmware can parse responses uniformly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T: Serialize> {
    /// `"success"` or `"error"`.
    pub status: String,
    /// Response payload (success only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Machine-readable error code (error only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Human-readable message (error only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// When the response was produced.
    pub timestamp: DateTime<Utc>,
    /// Identifier correlating this response with server logs.
    pub request_id: Uuid,
}

impl<T: Serialize> ApiEnvelope<T> {
    /// Creates a successful envelope around `data`.
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            data: Some(data),
            error_code: None,
            message: None,
            timestamp: Utc::now(),
            request_id: Uuid::new_v4(),
        }
    }

    /// Creates an error envelope.
    pub fn error(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error_code: Some(error_code.into()),
            message: Some(message.into()),
            timestamp: Utc::now(),
            request_id: Uuid::new_v4(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_omits_error_fields() {
        let env = ApiEnvelope::success(serde_json::json!({"synced": true}));
        let json = serde_json::to_value(&env).unwrap();

        assert_eq!(json["status"], "success");
        assert_eq!(json["data"]["synced"], true);
        assert!(json.get("error_code").is_none());
        assert!(json.get("message").is_none());
        assert!(json.get("request_id").is_some());
        assert!(json.get("timestamp").is_some());
    }

    #[test]
    fn error_envelope_omits_data() {
        let env = ApiEnvelope::<()>::error("VALIDATION_ERROR", "latitude out of range");
        let json = serde_json::to_value(&env).unwrap();

        assert_eq!(json["status"], "error");
        assert_eq!(json["error_code"], "VALIDATION_ERROR");
        assert_eq!(json["message"], "latitude out of range");
        assert!(json.get("data").is_none());
    }
}
