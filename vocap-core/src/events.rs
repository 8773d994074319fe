//! Events broadcast by a recorder session.
//!
//! Hosts subscribe to these to drive level meters and state indicators
//! without polling. Field names serialize camelCase for JavaScript-side
//! consumers.

use serde::{Deserialize, Serialize};

/// Emitted periodically by the capture loop (once per device buffer).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelEvent {
    /// Monotonically increasing event sequence number.
    pub seq: u64,
    /// Channel-averaged absolute amplitude of the latest frame.
    pub level: i32,
    /// Running peak since the meter was last read or reset.
    pub peak: i32,
    /// Whether frames are currently being recorded into the buffer.
    pub armed: bool,
}

/// Emitted when the session state changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderStatusEvent {
    pub status: RecorderStatus,
    /// Optional human-readable detail (e.g. a device error message).
    pub detail: Option<String>,
}

/// Lifecycle state of a recorder session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderStatus {
    /// Session created, stream never opened.
    Idle,
    /// Capture stream running; the level meter is live.
    Open,
    /// Stream closed; the capture is frozen and ready to finalize.
    Closed,
    /// Device failure — the capture (if any) was discarded.
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_event_serializes_with_camel_case_fields() {
        let event = LevelEvent {
            seq: 12,
            level: 4_200,
            peak: 90_000,
            armed: true,
        };

        let json = serde_json::to_value(event).expect("serialize level event");
        assert_eq!(json["seq"], 12);
        assert_eq!(json["level"], 4_200);
        assert_eq!(json["peak"], 90_000);
        assert_eq!(json["armed"], true);

        let round_trip: LevelEvent = serde_json::from_value(json).expect("deserialize level event");
        assert_eq!(round_trip.peak, 90_000);
        assert!(round_trip.armed);
    }

    #[test]
    fn status_event_serializes_with_lowercase_status() {
        let event = RecorderStatusEvent {
            status: RecorderStatus::Closed,
            detail: Some("stream closed".into()),
        };

        let json = serde_json::to_value(&event).expect("serialize status event");
        assert_eq!(json["status"], "closed");
        assert_eq!(json["detail"], "stream closed");

        let round_trip: RecorderStatusEvent =
            serde_json::from_value(json).expect("deserialize status event");
        assert_eq!(round_trip.status, RecorderStatus::Closed);
    }

    #[test]
    fn status_rejects_non_lowercase_values() {
        let err = serde_json::from_str::<RecorderStatus>(r#""Open""#);
        assert!(err.is_err(), "expected invalid casing to fail");
    }
}
