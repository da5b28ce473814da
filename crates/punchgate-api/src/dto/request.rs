//! Request DTOs with validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use punchgate_entity::attendance::{AttendanceEvent, ClockKind};

/// A single clock submission (`POST /attendance/clock`), and the per-record
/// shape inside a batch.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ClockRequest {
    /// Employee identifier.
    #[validate(length(min = 1, message = "employee_id is required"))]
    pub employee_id: String,
    /// When the event happened.
    pub timestamp: DateTime<Utc>,
    /// Clock direction.
    pub kind: ClockKind,
    /// Capturing device.
    #[serde(default)]
    pub device_id: Option<String>,
    /// Site tag.
    #[serde(default)]
    pub site_id: Option<String>,
    /// Capture latitude.
    #[serde(default)]
    #[validate(range(min = -90.0, max = 90.0, message = "latitude out of range"))]
    pub latitude: Option<f64>,
    /// Capture longitude.
    #[serde(default)]
    #[validate(range(min = -180.0, max = 180.0, message = "longitude out of range"))]
    pub longitude: Option<f64>,
    /// Caller-supplied idempotency key.
    #[serde(default)]
    pub client_record_id: Option<String>,
}

impl ClockRequest {
    /// Convert into the domain event.
    pub fn into_event(self) -> AttendanceEvent {
        AttendanceEvent {
            employee_id: self.employee_id,
            timestamp: self.timestamp,
            kind: self.kind,
            device_id: self.device_id,
            site_id: self.site_id,
            latitude: self.latitude,
            longitude: self.longitude,
            client_record_id: self.client_record_id,
        }
    }
}

/// Batch submission body (`POST /attendance/batch`).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BatchRequest {
    /// 1..=200 records; per-record failures never reject the whole batch.
    #[validate(length(min = 1, max = 200, message = "records must contain 1..=200 entries"))]
    pub records: Vec<ClockRequest>,
    /// Grouping tag for later status queries.
    #[serde(default)]
    pub batch_id: Option<String>,
    /// Skip the synchronous upstream attempt; leave every record pending.
    #[serde(default)]
    pub offline_sync: bool,
}

/// Device login body (`POST /auth/login`).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    /// The device/account identifier sessions are issued to.
    #[validate(length(min = 1, message = "subject_id is required"))]
    pub subject_id: String,
    /// Device identifier.
    #[serde(default)]
    pub device_id: Option<String>,
    /// Fleet provisioning key.
    #[validate(length(min = 1, message = "device_key is required"))]
    pub device_key: String,
}

/// Token refresh body (`POST /auth/refresh`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token.
    pub refresh_token: String,
}

/// Force-sync body (`POST /sync/trigger` with explicit ids).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerRequest {
    /// Queue entry ids to force-sync, bypassing the attempt cap. Empty or
    /// absent runs a normal drain cycle.
    #[serde(default)]
    pub ids: Vec<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(employee: &str) -> serde_json::Value {
        serde_json::json!({
            "employee_id": employee,
            "timestamp": "2024-06-10T08:30:00Z",
            "kind": "clock-in",
        })
    }

    #[test]
    fn clock_request_bounds_coordinates() {
        let mut req: ClockRequest = serde_json::from_value(record("E1")).unwrap();
        assert!(req.validate().is_ok());

        req.latitude = Some(90.5);
        assert!(req.validate().is_err());

        req.latitude = Some(-90.0);
        req.longitude = Some(180.0);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn batch_request_bounds_record_count() {
        let empty: BatchRequest =
            serde_json::from_value(serde_json::json!({"records": []})).unwrap();
        assert!(empty.validate().is_err());

        let ok: BatchRequest =
            serde_json::from_value(serde_json::json!({"records": [record("E1")]})).unwrap();
        assert!(ok.validate().is_ok());
        assert!(!ok.offline_sync);

        let too_many: BatchRequest = serde_json::from_value(serde_json::json!({
            "records": (0..201).map(|i| record(&format!("E{i}"))).collect::<Vec<_>>(),
        }))
        .unwrap();
        assert!(too_many.validate().is_err());
    }
}
