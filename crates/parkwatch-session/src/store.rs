// SPDX-FileCopyrightText: 2026 Parkwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Observable session state with per-kind conversation slots.
//!
//! The store holds one [`SessionSnapshot`] behind a `tokio::sync::watch`
//! channel: every mutation replaces the snapshot and notifies subscribers.
//! Conversations live in one slot per [`ConversationKind`]; an empty slot
//! is the idle state. A store-wide generation counter stamps each new
//! conversation so stale replies and stale soft-timers can be dropped.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info};

use parkwatch_core::types::{
    ConnectionStatus, Conversation, ConversationKind, ConversationState, DeviceStatus,
    FrameLog, InboundFrame, Prompt,
};

/// Complete observable state of the session layer at one instant.
///
/// Cloned out wholesale; consumers never hold references into the store.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    /// Broker connection status as last reported by the transport.
    pub connection: ConnectionStatus,
    /// Last-known controller status, replaced on every status message.
    pub device: DeviceStatus,
    /// Diagnostic record of the most recent inbound frame, decodable or not.
    pub last_frame: Option<FrameLog>,
    /// Active pairing conversation, if any.
    pub pairing: Option<Conversation>,
    /// Active token-deletion conversation, if any.
    pub delete: Option<Conversation>,
    /// Active two-factor entry conversation, if any.
    pub two_factor: Option<Conversation>,
    /// Pending presentation request, queue of one.
    pub prompt: Option<Prompt>,
}

impl SessionSnapshot {
    /// The conversation slot for a kind.
    pub fn conversation(&self, kind: ConversationKind) -> Option<&Conversation> {
        match kind {
            ConversationKind::Pairing => self.pairing.as_ref(),
            ConversationKind::DeleteToken => self.delete.as_ref(),
            ConversationKind::TwoFactorAuth => self.two_factor.as_ref(),
        }
    }

    fn slot_mut(&mut self, kind: ConversationKind) -> &mut Option<Conversation> {
        match kind {
            ConversationKind::Pairing => &mut self.pairing,
            ConversationKind::DeleteToken => &mut self.delete,
            ConversationKind::TwoFactorAuth => &mut self.two_factor,
        }
    }
}

/// Single-writer store over the session snapshot.
///
/// All mutation goes through methods on this type; readers either clone a
/// [`snapshot`](SessionStore::snapshot) or [`subscribe`](SessionStore::subscribe)
/// for change notifications. Methods that may be stale-dropped return
/// whether they applied.
pub struct SessionStore {
    tx: watch::Sender<SessionSnapshot>,
    generation: AtomicU64,
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SessionSnapshot::default());
        Self {
            tx,
            generation: AtomicU64::new(0),
        }
    }

    /// Clones the current snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }

    /// Subscribes to snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }

    /// Records the transport connection status.
    ///
    /// A transition to `Disconnected` also marks the device offline; active
    /// conversations are left untouched and resume if the device reports
    /// progress after a reconnect.
    pub fn set_connection(&self, status: ConnectionStatus) {
        self.tx.send_if_modified(|snap| {
            if snap.connection == status {
                return false;
            }
            snap.connection = status;
            if status == ConnectionStatus::Disconnected {
                snap.device.online = false;
            }
            true
        });
    }

    /// Records the most recent inbound frame for diagnostics.
    pub fn record_frame(&self, frame: &InboundFrame) {
        let log = FrameLog {
            topic: frame.topic.clone(),
            text: frame.payload_text().into_owned(),
            received_at: frame.received_at,
        };
        self.tx.send_modify(|snap| snap.last_frame = Some(log));
    }

    /// Replaces the controller status snapshot wholesale.
    pub fn apply_status(&self, status: DeviceStatus) {
        self.tx.send_if_modified(|snap| {
            if snap.device == status {
                return false;
            }
            snap.device = status;
            true
        });
    }

    /// Starts a conversation in the `Initiating` state, superseding any
    /// active conversation of the same kind. Returns the generation stamped
    /// onto the new conversation.
    pub fn begin(
        &self,
        kind: ConversationKind,
        correlation_id: &str,
        message: &str,
    ) -> u64 {
        let generation = self.next_generation();
        self.tx.send_modify(|snap| {
            let slot = snap.slot_mut(kind);
            if let Some(old) = slot.as_ref() {
                if !old.state.is_terminal() {
                    info!(
                        kind = %kind,
                        superseded = old.correlation_id.as_str(),
                        "superseding active conversation"
                    );
                }
            }
            *slot = Some(Conversation::new(
                kind,
                correlation_id,
                generation,
                ConversationState::Initiating,
                message,
            ));
        });
        generation
    }

    /// Opens a device-initiated two-factor conversation in the `Ready`
    /// state, together with its prompt. Returns the stamped generation.
    pub fn open_two_factor(
        &self,
        ibutton_id: &str,
        message: &str,
        payload: Value,
        prompt: Prompt,
    ) -> u64 {
        let generation = self.next_generation();
        self.tx.send_modify(|snap| {
            let mut conversation = Conversation::new(
                ConversationKind::TwoFactorAuth,
                ibutton_id,
                generation,
                ConversationState::Ready,
                message,
            );
            conversation.payload = Some(payload.clone());
            snap.two_factor = Some(conversation);
            snap.prompt = Some(prompt.clone());
        });
        generation
    }

    /// Moves the active conversation of `kind` to `Ready`.
    ///
    /// When `correlation_id` is given it must match the active conversation;
    /// a mismatch means a stale or foreign reply and the call is dropped.
    /// Returns whether the transition applied.
    pub fn mark_ready(
        &self,
        kind: ConversationKind,
        correlation_id: Option<&str>,
        message: &str,
    ) -> bool {
        self.transition(kind, correlation_id, |conversation| {
            if conversation.state != ConversationState::Initiating {
                return false;
            }
            conversation.state = ConversationState::Ready;
            conversation.message = message.to_string();
            true
        })
    }

    /// Moves the active conversation of `kind` to terminal `Succeeded`.
    pub fn mark_succeeded(
        &self,
        kind: ConversationKind,
        correlation_id: Option<&str>,
        message: &str,
        payload: Option<Value>,
    ) -> bool {
        self.transition(kind, correlation_id, |conversation| {
            conversation.state = ConversationState::Succeeded;
            conversation.message = message.to_string();
            conversation.payload = payload.clone();
            true
        })
    }

    /// Moves the active conversation of `kind` to terminal `Failed`.
    pub fn mark_failed(
        &self,
        kind: ConversationKind,
        correlation_id: Option<&str>,
        message: &str,
        payload: Option<Value>,
    ) -> bool {
        self.transition(kind, correlation_id, |conversation| {
            conversation.state = ConversationState::Failed;
            conversation.message = message.to_string();
            conversation.payload = payload.clone();
            true
        })
    }

    /// Updates the status line of a conversation that is still `Initiating`
    /// at the given generation. Soft-timer callback: a conversation that
    /// has moved on, been superseded, or been cleared makes this a no-op.
    pub fn mark_waiting(&self, kind: ConversationKind, generation: u64, message: &str) -> bool {
        self.tx.send_if_modified(|snap| {
            let Some(conversation) = snap.slot_mut(kind).as_mut() else {
                return false;
            };
            if conversation.generation != generation
                || conversation.state != ConversationState::Initiating
            {
                return false;
            }
            conversation.message = message.to_string();
            true
        })
    }

    /// Empties the conversation slot for `kind`, returning to idle.
    /// Clearing the two-factor slot also drops its prompt.
    pub fn clear(&self, kind: ConversationKind) -> bool {
        self.tx.send_if_modified(|snap| {
            let cleared = snap.slot_mut(kind).take().is_some();
            if kind == ConversationKind::TwoFactorAuth && snap.prompt.is_some() {
                snap.prompt = None;
                return true;
            }
            cleared
        })
    }

    /// Drops the pending prompt, if any, leaving conversations untouched.
    pub fn clear_prompt(&self) -> bool {
        self.tx.send_if_modified(|snap| snap.prompt.take().is_some())
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Shared guard logic for inbound transitions: the slot must hold a
    /// non-terminal conversation whose correlation id matches, when one is
    /// required.
    fn transition(
        &self,
        kind: ConversationKind,
        correlation_id: Option<&str>,
        apply: impl FnOnce(&mut Conversation) -> bool,
    ) -> bool {
        self.tx.send_if_modified(|snap| {
            let Some(conversation) = snap.slot_mut(kind).as_mut() else {
                debug!(kind = %kind, "event for idle conversation slot, dropping");
                return false;
            };
            if conversation.state.is_terminal() {
                debug!(kind = %kind, "event for terminal conversation, dropping");
                return false;
            }
            if let Some(id) = correlation_id {
                if conversation.correlation_id != id {
                    debug!(
                        kind = %kind,
                        active = conversation.correlation_id.as_str(),
                        stale = id,
                        "correlation mismatch, dropping stale reply"
                    );
                    return false;
                }
            }
            apply(conversation)
        })
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use parkwatch_core::types::{PromptAction, PromptEffect};

    use super::*;

    fn prompt() -> Prompt {
        Prompt {
            title: "Entry request".into(),
            body: "iButton AB12".into(),
            actions: vec![PromptAction {
                label: "Dismiss".into(),
                effect: PromptEffect::Dismiss,
            }],
            dismissable: false,
        }
    }

    #[test]
    fn begin_creates_initiating_conversation() {
        let store = SessionStore::new();
        let generation = store.begin(ConversationKind::Pairing, "S1", "contacting device");

        let snap = store.snapshot();
        let conversation = snap.pairing.as_ref().unwrap();
        assert_eq!(conversation.correlation_id, "S1");
        assert_eq!(conversation.state, ConversationState::Initiating);
        assert_eq!(conversation.generation, generation);
        assert!(snap.delete.is_none());
        assert!(snap.two_factor.is_none());
    }

    #[test]
    fn begin_supersedes_same_kind_and_bumps_generation() {
        let store = SessionStore::new();
        let first = store.begin(ConversationKind::Pairing, "S1", "contacting device");
        let second = store.begin(ConversationKind::Pairing, "S2", "contacting device");
        assert!(second > first);

        let snap = store.snapshot();
        assert_eq!(snap.pairing.as_ref().unwrap().correlation_id, "S2");

        // A reply for the superseded conversation no longer applies.
        assert!(!store.mark_ready(ConversationKind::Pairing, Some("S1"), "ready"));
        assert!(store.mark_ready(ConversationKind::Pairing, Some("S2"), "ready"));
    }

    #[test]
    fn conversations_of_different_kinds_coexist() {
        let store = SessionStore::new();
        store.begin(ConversationKind::Pairing, "S1", "contacting device");
        store.begin(ConversationKind::DeleteToken, "D1", "contacting device");

        let snap = store.snapshot();
        assert!(snap.pairing.is_some());
        assert!(snap.delete.is_some());
    }

    #[test]
    fn ready_requires_initiating_state() {
        let store = SessionStore::new();
        store.begin(ConversationKind::Pairing, "S1", "contacting device");
        assert!(store.mark_ready(ConversationKind::Pairing, Some("S1"), "ready"));
        // Second ready for the same conversation is dropped.
        assert!(!store.mark_ready(ConversationKind::Pairing, Some("S1"), "ready again"));
    }

    #[test]
    fn terminal_conversations_ignore_further_events() {
        let store = SessionStore::new();
        store.begin(ConversationKind::Pairing, "S1", "contacting device");
        assert!(store.mark_failed(ConversationKind::Pairing, Some("S1"), "failed", None));
        assert!(!store.mark_succeeded(ConversationKind::Pairing, Some("S1"), "done", None));

        let snap = store.snapshot();
        assert_eq!(snap.pairing.as_ref().unwrap().state, ConversationState::Failed);
    }

    #[test]
    fn events_without_active_conversation_are_dropped() {
        let store = SessionStore::new();
        assert!(!store.mark_ready(ConversationKind::DeleteToken, None, "ready"));
        assert!(!store.mark_succeeded(ConversationKind::DeleteToken, None, "done", None));
        assert!(store.snapshot().delete.is_none());
    }

    #[test]
    fn mark_waiting_applies_only_at_matching_generation() {
        let store = SessionStore::new();
        let stale = store.begin(ConversationKind::Pairing, "S1", "contacting device");
        store.begin(ConversationKind::Pairing, "S2", "contacting device");

        assert!(!store.mark_waiting(ConversationKind::Pairing, stale, "taking long"));
        assert_eq!(
            store.snapshot().pairing.as_ref().unwrap().message,
            "contacting device"
        );
    }

    #[test]
    fn mark_waiting_is_noop_after_ready() {
        let store = SessionStore::new();
        let generation = store.begin(ConversationKind::Pairing, "S1", "contacting device");
        store.mark_ready(ConversationKind::Pairing, Some("S1"), "ready");

        assert!(!store.mark_waiting(ConversationKind::Pairing, generation, "taking long"));
        assert_eq!(store.snapshot().pairing.as_ref().unwrap().message, "ready");
    }

    #[test]
    fn mark_waiting_updates_message_while_initiating() {
        let store = SessionStore::new();
        let generation = store.begin(ConversationKind::Pairing, "S1", "contacting device");
        assert!(store.mark_waiting(ConversationKind::Pairing, generation, "taking long"));
        assert_eq!(
            store.snapshot().pairing.as_ref().unwrap().message,
            "taking long"
        );
        assert_eq!(
            store.snapshot().pairing.as_ref().unwrap().state,
            ConversationState::Initiating
        );
    }

    #[test]
    fn clear_returns_slot_to_idle() {
        let store = SessionStore::new();
        store.begin(ConversationKind::Pairing, "S1", "contacting device");
        assert!(store.clear(ConversationKind::Pairing));
        assert!(store.snapshot().pairing.is_none());
        // Idempotent.
        assert!(!store.clear(ConversationKind::Pairing));
    }

    #[test]
    fn clear_two_factor_drops_prompt() {
        let store = SessionStore::new();
        store.open_two_factor("AB12", "entry request", serde_json::json!({}), prompt());
        assert!(store.snapshot().prompt.is_some());

        store.clear(ConversationKind::TwoFactorAuth);
        let snap = store.snapshot();
        assert!(snap.two_factor.is_none());
        assert!(snap.prompt.is_none());
    }

    #[test]
    fn open_two_factor_starts_ready_with_payload() {
        let store = SessionStore::new();
        let payload = serde_json::json!({"ibutton_id": "AB12", "associated_id": 0});
        store.open_two_factor("AB12", "entry request", payload.clone(), prompt());

        let snap = store.snapshot();
        let conversation = snap.two_factor.as_ref().unwrap();
        assert_eq!(conversation.state, ConversationState::Ready);
        assert_eq!(conversation.correlation_id, "AB12");
        assert_eq!(conversation.payload.as_ref(), Some(&payload));
        assert!(snap.prompt.is_some());
    }

    #[test]
    fn disconnect_marks_device_offline_but_keeps_conversations() {
        let store = SessionStore::new();
        store.apply_status(DeviceStatus {
            online: true,
            occupied: 3,
            total: 10,
        });
        store.begin(ConversationKind::Pairing, "S1", "contacting device");

        store.set_connection(ConnectionStatus::Disconnected);
        let snap = store.snapshot();
        assert!(!snap.device.online);
        // Occupancy counts are stale data, not reset.
        assert_eq!(snap.device.occupied, 3);
        assert!(snap.pairing.is_some());
    }

    #[test]
    fn record_frame_keeps_only_latest() {
        let store = SessionStore::new();
        store.record_frame(&InboundFrame::new("park/status", b"{}".to_vec()));
        store.record_frame(&InboundFrame::new("park/other", b"x".to_vec()));

        let snap = store.snapshot();
        assert_eq!(snap.last_frame.as_ref().unwrap().topic, "park/other");
    }

    #[tokio::test]
    async fn subscribers_observe_mutations() {
        let store = SessionStore::new();
        let mut rx = store.subscribe();

        store.apply_status(DeviceStatus {
            online: true,
            occupied: 1,
            total: 4,
        });

        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().device.online);
    }
}
