//! Deterministic identity hash for attendance events.
//!
//! The server must reject duplicate physical events even when the device
//! forgets it has already sent them (network glitch between send and ack).
//! Devices may also supply their own idempotency key, which is used verbatim
//! so the same logical event can be addressed across retries.

use sha2::{Digest, Sha256};

use super::model::AttendanceEvent;

/// Field separator in the normalized pre-image. ASCII unit separator cannot
/// appear in the normalized timestamp or kind, and is not meaningful inside
/// opaque identifiers.
const SEPARATOR: char = '\u{1f}';

/// Compute the 256-bit identity of an event as a lowercase hex string.
///
/// If the event carries a `client_record_id`, that value is returned
/// verbatim. Otherwise the identity is SHA-256 over the normalized fields
/// `employee_id`, timestamp (UTC, second precision), kind, and `device_id`
/// (empty when absent), in that order.
pub fn fingerprint(event: &AttendanceEvent) -> String {
    if let Some(client_id) = &event.client_record_id {
        return client_id.clone();
    }

    let mut hasher = Sha256::new();
    hasher.update(event.employee_id.as_bytes());
    hasher.update(SEPARATOR.to_string().as_bytes());
    hasher.update(
        event
            .timestamp
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string()
            .as_bytes(),
    );
    hasher.update(SEPARATOR.to_string().as_bytes());
    hasher.update(event.kind.as_str().as_bytes());
    hasher.update(SEPARATOR.to_string().as_bytes());
    hasher.update(event.device_id.as_deref().unwrap_or("").as_bytes());

    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::model::ClockKind;
    use chrono::{TimeZone, Utc};

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
    fn deterministic_for_equal_events() {
        assert_eq!(fingerprint(&event()), fingerprint(&event()));
    }

    #[test]
    fn is_64_hex_chars() {
        let fp = fingerprint(&event());
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn differs_when_any_identity_field_differs() {
        let base = fingerprint(&event());

        let mut e = event();
        e.employee_id = "EMP-002".to_string();
        assert_ne!(fingerprint(&e), base);

        let mut e = event();
        e.kind = ClockKind::ClockOut;
        assert_ne!(fingerprint(&e), base);

        let mut e = event();
        e.timestamp = Utc.with_ymd_and_hms(2024, 6, 10, 8, 30, 1).unwrap();
        assert_ne!(fingerprint(&e), base);

        let mut e = event();
        e.device_id = None;
        assert_ne!(fingerprint(&e), base);
    }

    #[test]
    fn ignores_non_identity_fields() {
        let base = fingerprint(&event());

        let mut e = event();
        e.site_id = Some("HQ".to_string());
        e.latitude = Some(52.52);
        e.longitude = Some(13.405);
        assert_eq!(fingerprint(&e), base);
    }

    #[test]
    fn sub_second_precision_is_truncated() {
        let mut a = event();
        a.timestamp = Utc.with_ymd_and_hms(2024, 6, 10, 8, 30, 0).unwrap()
            + chrono::Duration::milliseconds(250);
        assert_eq!(fingerprint(&a), fingerprint(&event()));
    }

    #[test]
    fn client_record_id_wins_verbatim() {
        let mut e = event();
        e.client_record_id = Some("device-42-seq-9001".to_string());
        assert_eq!(fingerprint(&e), "device-42-seq-9001");
    }

    #[test]
    fn separator_prevents_field_bleed() {
        // "AB" + "" must not collide with "A" + "B".
        let mut a = event();
        a.employee_id = "E1X".to_string();
        a.device_id = Some("D".to_string());

        let mut b = event();
        b.employee_id = "E1".to_string();
        b.device_id = Some("XD".to_string());

        assert_ne!(fingerprint(&a), fingerprint(&b));
    }
}
