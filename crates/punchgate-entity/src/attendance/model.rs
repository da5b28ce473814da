//! Attendance event entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a clock event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClockKind {
    /// Employee arriving.
    #[serde(rename = "clock-in")]
    ClockIn,
    /// Employee leaving.
    #[serde(rename = "clock-out")]
    ClockOut,
}

impl ClockKind {
    /// Return the kind as its wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClockIn => "clock-in",
            Self::ClockOut => "clock-out",
        }
    }

    /// The `log_type` value the upstream ERP expects.
    pub fn erp_log_type(&self) -> &'static str {
        match self {
            Self::ClockIn => "IN",
            Self::ClockOut => "OUT",
        }
    }
}

impl fmt::Display for ClockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single clock-in or clock-out event as submitted by a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceEvent {
    /// Employee identifier in the upstream ERP.
    pub employee_id: String,
    /// When the event physically happened.
    pub timestamp: DateTime<Utc>,
    /// Clock direction.
    pub kind: ClockKind,
    /// Device that captured the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Site the device is installed at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
    /// Capture latitude.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Capture longitude.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Caller-supplied idempotency key; used verbatim as the fingerprint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_record_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event() -> AttendanceEvent {
        AttendanceEvent {
            employee_id: "EMP-001".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 6, 10, 8, 30, 0).unwrap(),
            kind: ClockKind::ClockIn,
            device_id: Some("TAB-7".to_string()),
            site_id: None,
            latitude: None,
            longitude: None,
            client_record_id: None,
        }
    }

    #[test]
    fn kind_round_trips_through_wire_strings() {
        let json = serde_json::to_string(&ClockKind::ClockIn).unwrap();
        assert_eq!(json, "\"clock-in\"");
        let back: ClockKind = serde_json::from_str("\"clock-out\"").unwrap();
        assert_eq!(back, ClockKind::ClockOut);
    }

    #[test]
    fn timestamp_round_trips() {
        let e = event();
        let json = serde_json::to_string(&e).unwrap();
        let back: AttendanceEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.timestamp, e.timestamp);
    }

    #[test]
    fn erp_log_type_mapping() {
        assert_eq!(ClockKind::ClockIn.erp_log_type(), "IN");
        assert_eq!(ClockKind::ClockOut.erp_log_type(), "OUT");
    }
}
