// SPDX-FileCopyrightText: 2026 Parkwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Topic-suffix classification of inbound frames into typed device events.
//!
//! Zero-I/O: classification is a pure function of the topic string and the
//! decoded payload. Frames that match no known suffix, or that miss a
//! required field, classify to `None` and only touch the diagnostic slot.

use parkwatch_core::topics;
use parkwatch_core::types::DeviceStatus;
use serde_json::Value;
use tracing::debug;

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// Controller status snapshot replacement.
    Status(DeviceStatus),
    /// Device acknowledged a pairing request and awaits the token.
    PairingReady { session_id: String },
    /// Pairing finished successfully; payload carries the new token ids.
    PairingSucceeded { session_id: String, payload: Value },
    /// Pairing failed; `reason` is shown verbatim.
    PairingFailed {
        session_id: String,
        reason: String,
        payload: Value,
    },
    /// Device-initiated two-factor entry request.
    TwoFactorRequest {
        ibutton_id: String,
        associated_id: Value,
        payload: Value,
    },
    /// Device entered token-delete mode.
    DeleteReady,
    /// Token deletion finished successfully.
    DeleteSucceeded { payload: Value },
    /// Token deletion failed.
    DeleteFailed { payload: Value },
}

/// Classifies one (topic, decoded payload) pair into zero or one events.
///
/// Unknown topics never raise an error; required-field misses are logged
/// at debug level and the frame is dropped for that purpose.
pub fn classify(topic: &str, payload: &Value) -> Option<DeviceEvent> {
    if has_suffix(topic, topics::STATUS) {
        // `online` must be present for a frame to count as a snapshot.
        payload.get("online")?;
        return Some(DeviceEvent::Status(DeviceStatus {
            online: payload.get("online").and_then(Value::as_bool).unwrap_or(false),
            occupied: payload
                .get("occupancy")
                .and_then(Value::as_u64)
                .unwrap_or(0) as u32,
            total: payload
                .get("total_spaces")
                .and_then(Value::as_u64)
                .unwrap_or(0) as u32,
        }));
    }

    if topic.contains("/pairing/") || topic.starts_with("pairing/") {
        let Some(session_id) = payload.get("pairing_session_id").and_then(session_id_text)
        else {
            debug!(topic, "pairing frame without pairing_session_id, ignoring");
            return None;
        };

        if has_suffix(topic, topics::PAIRING_READY) {
            return Some(DeviceEvent::PairingReady { session_id });
        }
        if has_suffix(topic, topics::PAIRING_SUCCESS) {
            return Some(DeviceEvent::PairingSucceeded {
                session_id,
                payload: payload.clone(),
            });
        }
        if has_suffix(topic, topics::PAIRING_FAILURE) {
            let reason = payload
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            return Some(DeviceEvent::PairingFailed {
                session_id,
                reason,
                payload: payload.clone(),
            });
        }
        return None;
    }

    if has_suffix(topic, topics::TWO_FACTOR_REQUEST) {
        let ibutton_id = payload.get("ibutton_id").and_then(Value::as_str)?.to_string();
        // Presence is the requirement: 0 and null are valid associated ids,
        // only a missing field disqualifies the frame.
        let associated_id = payload.get("associated_id")?.clone();
        return Some(DeviceEvent::TwoFactorRequest {
            ibutton_id,
            associated_id,
            payload: payload.clone(),
        });
    }

    if has_suffix(topic, topics::DELETE_READY) {
        return Some(DeviceEvent::DeleteReady);
    }
    if has_suffix(topic, topics::DELETE_SUCCESS) {
        return Some(DeviceEvent::DeleteSucceeded {
            payload: payload.clone(),
        });
    }
    if has_suffix(topic, topics::DELETE_FAILURE) {
        return Some(DeviceEvent::DeleteFailed {
            payload: payload.clone(),
        });
    }

    None
}

/// Session ids arrive as strings from this client but some controller
/// firmware sends them as bare numbers; both correlate as text.
fn session_id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// True when `topic` is exactly `sub_topic` or ends with `/sub_topic`.
fn has_suffix(topic: &str, sub_topic: &str) -> bool {
    topic
        .strip_suffix(sub_topic)
        .is_some_and(|rest| rest.is_empty() || rest.ends_with('/'))
}
