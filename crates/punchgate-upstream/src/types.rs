//! Wire types for the upstream ERP checkin API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use punchgate_entity::attendance::AttendanceEvent;

/// Body of `POST /api/resource/Employee Checkin`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckinRecord {
    /// Employee identifier in the ERP.
    pub employee: String,
    /// Event time as `YYYY-MM-DD HH:MM:SS`, no timezone suffix.
    pub time: String,
    /// `"IN"` or `"OUT"`.
    pub log_type: String,
    /// Capturing device.
    pub device_id: String,
    /// Site tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_site: Option<String>,
    /// Capture latitude.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_latitude: Option<f64>,
    /// Capture longitude.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_longitude: Option<f64>,
}

impl CheckinRecord {
    /// Build the ERP payload for an attendance event.
    pub fn from_event(event: &AttendanceEvent) -> Self {
        Self {
            employee: event.employee_id.clone(),
            time: format_erp_time(event.timestamp),
            log_type: event.kind.erp_log_type().to_string(),
            device_id: event.device_id.clone().unwrap_or_default(),
            custom_site: event.site_id.clone(),
            custom_latitude: event.latitude,
            custom_longitude: event.longitude,
        }
    }
}

/// Format an instant the way the ERP expects: naive UTC, second precision,
/// no timezone suffix.
pub fn format_erp_time(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Per-record outcome of an upstream submission.
///
/// Partial batch success is represented, never raised: `submit_many`
/// returns one outcome per input in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOutcome {
    /// Whether the upstream accepted the record.
    pub success: bool,
    /// The `data` payload echoed by the upstream on acceptance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Failure description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// HTTP status, when a response was received at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl SubmitOutcome {
    /// An accepted record.
    pub fn accepted(data: Option<serde_json::Value>, status: u16) -> Self {
        Self {
            success: true,
            data,
            error: None,
            status: Some(status),
        }
    }

    /// A rejected or undeliverable record.
    pub fn failed(error: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use punchgate_entity::attendance::ClockKind;

    #[test]
    fn erp_time_has_no_timezone_suffix() {
        let ts = Utc.with_ymd_and_hms(2024, 6, 10, 8, 30, 5).unwrap();
        assert_eq!(format_erp_time(ts), "2024-06-10 08:30:05");
    }

    #[test]
    fn checkin_record_maps_event_fields() {
        let event = AttendanceEvent {
            employee_id: "EMP-001".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 6, 10, 8, 30, 0).unwrap(),
            kind: ClockKind::ClockOut,
            device_id: Some("TAB-7".to_string()),
            site_id: Some("HQ".to_string()),
            latitude: Some(52.52),
            longitude: None,
            client_record_id: None,
        };

        let record = CheckinRecord::from_event(&event);
        assert_eq!(record.employee, "EMP-001");
        assert_eq!(record.time, "2024-06-10 08:30:00");
        assert_eq!(record.log_type, "OUT");
        assert_eq!(record.device_id, "TAB-7");
        assert_eq!(record.custom_site.as_deref(), Some("HQ"));

        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("custom_longitude").is_none());
    }
}
