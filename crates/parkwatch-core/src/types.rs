// SPDX-FileCopyrightText: 2026 Parkwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the Parkwatch session layer.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

/// Lifecycle state of the single broker connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// No connection, and none in progress.
    #[default]
    Disconnected,
    /// A connect or reconnect attempt is in flight.
    Connecting,
    /// Connected and subscribed.
    Connected,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Connected => write!(f, "connected"),
        }
    }
}

/// A single raw frame received from the broker.
///
/// Ephemeral: consumed by the router and discarded. Only a [`FrameLog`]
/// of the most recent frame is retained for diagnostics.
#[derive(Debug, Clone)]
pub struct InboundFrame {
    /// Full topic as delivered by the broker (namespace root included).
    pub topic: String,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
    /// Local receive timestamp.
    pub received_at: DateTime<Utc>,
}

impl InboundFrame {
    /// Creates a frame stamped with the current time.
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            received_at: Utc::now(),
        }
    }

    /// Lossy UTF-8 view of the payload for display and decoding fallback.
    pub fn payload_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// Diagnostic record of the last inbound frame, kept for log display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLog {
    pub topic: String,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

/// Last-known controller status snapshot, replaced wholesale on every
/// successfully parsed status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub online: bool,
    pub occupied: u32,
    pub total: u32,
}

/// The kind of a tracked request/response conversation with the controller.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum ConversationKind {
    Pairing,
    DeleteToken,
    TwoFactorAuth,
}

/// State of an active conversation. Idle is represented by the absence of
/// a conversation in the kind's slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    /// Local command published, awaiting device acknowledgment.
    Initiating,
    /// Device acknowledged and is waiting for a physical trigger.
    Ready,
    /// Terminal: device reported success.
    Succeeded,
    /// Terminal: device reported failure.
    Failed,
}

impl ConversationState {
    /// Terminal states ignore further inbound events for the same
    /// correlation id.
    pub fn is_terminal(self) -> bool {
        matches!(self, ConversationState::Succeeded | ConversationState::Failed)
    }
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversationState::Initiating => write!(f, "initiating"),
            ConversationState::Ready => write!(f, "ready"),
            ConversationState::Succeeded => write!(f, "succeeded"),
            ConversationState::Failed => write!(f, "failed"),
        }
    }
}

/// One in-flight correlated exchange with the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub kind: ConversationKind,
    /// Caller-generated session id for Pairing/DeleteToken; device-supplied
    /// token id for TwoFactorAuth.
    pub correlation_id: String,
    /// Store-wide generation at creation time. Stale replies and stale
    /// soft-timers carry an older generation and are dropped.
    pub generation: u64,
    pub state: ConversationState,
    /// Human-readable status line for display.
    pub message: String,
    /// Terminal success/failure data from the device.
    pub payload: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Creates a conversation in the given state, stamped with the current time.
    pub fn new(
        kind: ConversationKind,
        correlation_id: impl Into<String>,
        generation: u64,
        state: ConversationState,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            correlation_id: correlation_id.into(),
            generation,
            state,
            message: message.into(),
            payload: None,
            created_at: Utc::now(),
        }
    }
}

/// The effect a prompt action requests when selected.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptEffect {
    /// Approve the pending entry request for this token.
    AllowEntry {
        ibutton_id: String,
        associated_id: Value,
    },
    /// Deny the pending entry request for this token.
    DenyEntry {
        ibutton_id: String,
        associated_id: Value,
    },
    /// Dismiss the prompt without responding.
    Dismiss,
}

/// One selectable action on a prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptAction {
    pub label: String,
    pub effect: PromptEffect,
}

/// A queue-of-one presentation request emitted by the session layer.
///
/// Pure value type: a rendering shim outside the core turns this into an
/// actual dialog or snackbar.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub title: String,
    pub body: String,
    pub actions: Vec<PromptAction>,
    pub dismissable: bool,
}

/// Display text for an associated id, which the device may send as a
/// number or a string.
pub fn associated_id_text(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_status_display() {
        assert_eq!(ConnectionStatus::Disconnected.to_string(), "disconnected");
        assert_eq!(ConnectionStatus::Connecting.to_string(), "connecting");
        assert_eq!(ConnectionStatus::Connected.to_string(), "connected");
    }

    #[test]
    fn conversation_state_terminality() {
        assert!(!ConversationState::Initiating.is_terminal());
        assert!(!ConversationState::Ready.is_terminal());
        assert!(ConversationState::Succeeded.is_terminal());
        assert!(ConversationState::Failed.is_terminal());
    }

    #[test]
    fn conversation_kind_round_trip() {
        use std::str::FromStr;

        for kind in [
            ConversationKind::Pairing,
            ConversationKind::DeleteToken,
            ConversationKind::TwoFactorAuth,
        ] {
            let s = kind.to_string();
            assert_eq!(ConversationKind::from_str(&s).unwrap(), kind);
        }
    }

    #[test]
    fn frame_payload_text_is_lossy() {
        let frame = InboundFrame::new("park/status", vec![0xff, 0xfe, b'x']);
        // Invalid UTF-8 degrades to replacement characters, never errors.
        assert!(frame.payload_text().contains('x'));
    }

    #[test]
    fn device_status_defaults_offline_and_empty() {
        let status = DeviceStatus::default();
        assert!(!status.online);
        assert_eq!(status.occupied, 0);
        assert_eq!(status.total, 0);
    }

    #[test]
    fn associated_id_text_number_and_string() {
        assert_eq!(associated_id_text(&serde_json::json!(7)), "7");
        assert_eq!(associated_id_text(&serde_json::json!("A7")), "A7");
        assert_eq!(associated_id_text(&serde_json::json!(0)), "0");
    }
}
