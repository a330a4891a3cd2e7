// SPDX-FileCopyrightText: 2026 Parkwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound side of the session layer.
//!
//! The engine registers itself as the transport's frame listener, runs
//! every frame through decode and classification, and applies the
//! resulting event to the [`SessionStore`]. It also mirrors the
//! transport's connection status into the store. The engine never
//! publishes; the outbound side lives in the [`gateway`](crate::gateway).

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use parkwatch_core::traits::notify::EntryNotifier;
use parkwatch_core::traits::transport::PubSubTransport;
use parkwatch_core::types::{
    associated_id_text, ConversationKind, InboundFrame, Prompt, PromptAction, PromptEffect,
};
use parkwatch_core::ParkwatchError;
use parkwatch_router::{classify, decode_payload, DeviceEvent};

use crate::store::SessionStore;

/// Listener registry key used by the engine. Registering a second engine
/// on the same transport replaces the first.
pub const LISTENER_ID: &str = "session-engine";

/// Applies classified device events to the session store.
pub struct SessionEngine {
    store: Arc<SessionStore>,
    notifier: Arc<dyn EntryNotifier>,
}

impl SessionEngine {
    pub fn new(store: Arc<SessionStore>, notifier: Arc<dyn EntryNotifier>) -> Self {
        Self { store, notifier }
    }

    /// Wires this engine into a transport: registers the frame listener
    /// and spawns a task mirroring connection status into the store.
    pub fn attach(self: &Arc<Self>, transport: &Arc<dyn PubSubTransport>) {
        let engine = Arc::clone(self);
        transport.add_listener(
            LISTENER_ID,
            Arc::new(move |frame| engine.handle_frame(frame)),
        );

        let store = Arc::clone(&self.store);
        let mut rx = transport.watch_status();
        tokio::spawn(async move {
            store.set_connection(*rx.borrow());
            while rx.changed().await.is_ok() {
                let status = *rx.borrow_and_update();
                info!(status = %status, "connection status changed");
                store.set_connection(status);
            }
        });
    }

    /// Processes one inbound frame.
    ///
    /// Every frame updates the diagnostic last-frame record, even when it
    /// decodes to nothing actionable. Never fails: unknown topics and
    /// malformed payloads are dropped after the diagnostic update.
    pub fn handle_frame(&self, frame: &InboundFrame) -> Result<(), ParkwatchError> {
        self.store.record_frame(frame);

        let payload = decode_payload(&frame.payload);
        match classify(&frame.topic, &payload) {
            Some(event) => self.apply_event(event),
            None => debug!(topic = frame.topic.as_str(), "frame with no event, dropped"),
        }
        Ok(())
    }

    fn apply_event(&self, event: DeviceEvent) {
        match event {
            DeviceEvent::Status(status) => {
                debug!(
                    online = status.online,
                    occupied = status.occupied,
                    total = status.total,
                    "device status"
                );
                self.store.apply_status(status);
            }

            DeviceEvent::PairingReady { session_id } => {
                if self.store.mark_ready(
                    ConversationKind::Pairing,
                    Some(&session_id),
                    "Device ready. Touch the new iButton to the reader.",
                ) {
                    info!(session_id = session_id.as_str(), "pairing ready");
                }
            }
            DeviceEvent::PairingSucceeded {
                session_id,
                payload,
            } => {
                if self.store.mark_succeeded(
                    ConversationKind::Pairing,
                    Some(&session_id),
                    "iButton paired successfully.",
                    Some(payload),
                ) {
                    info!(session_id = session_id.as_str(), "pairing succeeded");
                }
            }
            DeviceEvent::PairingFailed {
                session_id,
                reason,
                payload,
            } => {
                if self.store.mark_failed(
                    ConversationKind::Pairing,
                    Some(&session_id),
                    &format!("Pairing failed: {reason}"),
                    Some(payload),
                ) {
                    info!(
                        session_id = session_id.as_str(),
                        reason = reason.as_str(),
                        "pairing failed"
                    );
                }
            }

            DeviceEvent::TwoFactorRequest {
                ibutton_id,
                associated_id,
                payload,
            } => {
                info!(
                    ibutton_id = ibutton_id.as_str(),
                    associated_id = %associated_id,
                    "two-factor entry request"
                );
                let prompt = entry_prompt(&ibutton_id, &associated_id);
                self.store.open_two_factor(
                    &ibutton_id,
                    "Entry request pending approval.",
                    payload,
                    prompt,
                );
                self.notifier.notify_entry_request(&ibutton_id, &associated_id);
            }

            DeviceEvent::DeleteReady => {
                if self.store.mark_ready(
                    ConversationKind::DeleteToken,
                    None,
                    "Delete mode active. Touch the iButton to remove it.",
                ) {
                    info!("delete mode ready");
                }
            }
            DeviceEvent::DeleteSucceeded { payload } => {
                if self.store.mark_succeeded(
                    ConversationKind::DeleteToken,
                    None,
                    "iButton deleted.",
                    Some(payload),
                ) {
                    info!("token deletion succeeded");
                }
            }
            DeviceEvent::DeleteFailed { payload } => {
                let reason = payload
                    .get("reason")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string();
                if self.store.mark_failed(
                    ConversationKind::DeleteToken,
                    None,
                    &format!("Deletion failed: {reason}"),
                    Some(payload),
                ) {
                    info!(reason = reason.as_str(), "token deletion failed");
                }
            }
        }
    }
}

/// Builds the approve/deny prompt for a two-factor entry request.
fn entry_prompt(ibutton_id: &str, associated_id: &Value) -> Prompt {
    let assoc = associated_id_text(associated_id);
    Prompt {
        title: "Entry Request".to_string(),
        body: format!("iButton {ibutton_id} (ID {assoc}) is requesting entry."),
        actions: vec![
            PromptAction {
                label: "Allow".to_string(),
                effect: PromptEffect::AllowEntry {
                    ibutton_id: ibutton_id.to_string(),
                    associated_id: associated_id.clone(),
                },
            },
            PromptAction {
                label: "Deny".to_string(),
                effect: PromptEffect::DenyEntry {
                    ibutton_id: ibutton_id.to_string(),
                    associated_id: associated_id.clone(),
                },
            },
        ],
        dismissable: false,
    }
}

#[cfg(test)]
mod tests {
    use parkwatch_core::types::{ConnectionStatus, ConversationState};
    use parkwatch_test_utils::{MockTransport, RecordingNotifier};
    use serde_json::json;

    use super::*;

    fn engine() -> (Arc<SessionEngine>, Arc<SessionStore>, Arc<RecordingNotifier>) {
        let store = Arc::new(SessionStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let engine = Arc::new(SessionEngine::new(
            Arc::clone(&store),
            Arc::clone(&notifier) as Arc<dyn EntryNotifier>,
        ));
        (engine, store, notifier)
    }

    fn frame(topic: &str, payload: Value) -> InboundFrame {
        InboundFrame::new(topic, payload.to_string().into_bytes())
    }

    #[test]
    fn status_frame_replaces_device_snapshot() {
        let (engine, store, _) = engine();
        engine
            .handle_frame(&frame(
                "sparking-esp32/status",
                json!({"online": true, "occupancy": 3, "total_spaces": 10}),
            ))
            .unwrap();

        let snap = store.snapshot();
        assert!(snap.device.online);
        assert_eq!(snap.device.occupied, 3);
        assert_eq!(snap.device.total, 10);
    }

    #[test]
    fn undecodable_frame_updates_only_last_frame() {
        let (engine, store, _) = engine();
        engine
            .handle_frame(&InboundFrame::new("sparking-esp32/status", b"%%%".to_vec()))
            .unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.device, Default::default());
        assert_eq!(snap.last_frame.as_ref().unwrap().text, "%%%");
    }

    #[test]
    fn pairing_ready_advances_matching_conversation() {
        let (engine, store, _) = engine();
        store.begin(ConversationKind::Pairing, "S1", "contacting device");

        engine
            .handle_frame(&frame(
                "sparking-esp32/pairing/ready_for_ibutton",
                json!({"pairing_session_id": "S1"}),
            ))
            .unwrap();

        assert_eq!(
            store.snapshot().pairing.as_ref().unwrap().state,
            ConversationState::Ready
        );
    }

    #[test]
    fn pairing_ready_with_stale_session_id_is_dropped() {
        let (engine, store, _) = engine();
        store.begin(ConversationKind::Pairing, "S2", "contacting device");

        engine
            .handle_frame(&frame(
                "sparking-esp32/pairing/ready_for_ibutton",
                json!({"pairing_session_id": "S1"}),
            ))
            .unwrap();

        assert_eq!(
            store.snapshot().pairing.as_ref().unwrap().state,
            ConversationState::Initiating
        );
    }

    #[test]
    fn pairing_failure_carries_reason_into_message() {
        let (engine, store, _) = engine();
        store.begin(ConversationKind::Pairing, "S1", "contacting device");

        engine
            .handle_frame(&frame(
                "sparking-esp32/pairing/failure",
                json!({"pairing_session_id": "S1", "reason": "timeout"}),
            ))
            .unwrap();

        let snap = store.snapshot();
        let conversation = snap.pairing.as_ref().unwrap();
        assert_eq!(conversation.state, ConversationState::Failed);
        assert!(conversation.message.contains("timeout"));
    }

    #[test]
    fn two_factor_request_opens_conversation_prompt_and_notifies() {
        let (engine, store, notifier) = engine();

        engine
            .handle_frame(&frame(
                "sparking-esp32/auth/2fa_request",
                json!({"ibutton_id": "AB12", "associated_id": 7}),
            ))
            .unwrap();

        let snap = store.snapshot();
        let conversation = snap.two_factor.as_ref().unwrap();
        assert_eq!(conversation.state, ConversationState::Ready);
        assert_eq!(conversation.correlation_id, "AB12");

        let prompt = snap.prompt.as_ref().unwrap();
        assert_eq!(prompt.actions.len(), 2);
        assert!(prompt.body.contains("AB12"));
        assert!(prompt.body.contains('7'));

        assert_eq!(notifier.notifications(), vec![("AB12".to_string(), json!(7))]);
    }

    #[test]
    fn two_factor_request_without_associated_id_is_dropped() {
        let (engine, store, notifier) = engine();

        engine
            .handle_frame(&frame(
                "sparking-esp32/auth/2fa_request",
                json!({"ibutton_id": "AB12"}),
            ))
            .unwrap();

        assert!(store.snapshot().two_factor.is_none());
        assert_eq!(notifier.notification_count(), 0);
    }

    #[test]
    fn delete_flow_correlates_on_the_active_slot() {
        let (engine, store, _) = engine();
        store.begin(ConversationKind::DeleteToken, "D1", "contacting device");

        engine
            .handle_frame(&frame("sparking-esp32/ibutton/delete_ready", json!({})))
            .unwrap();
        assert_eq!(
            store.snapshot().delete.as_ref().unwrap().state,
            ConversationState::Ready
        );

        engine
            .handle_frame(&frame(
                "sparking-esp32/ibutton/delete_success",
                json!({"ibutton_id": "AB12"}),
            ))
            .unwrap();
        assert_eq!(
            store.snapshot().delete.as_ref().unwrap().state,
            ConversationState::Succeeded
        );
    }

    #[test]
    fn delete_events_without_active_conversation_are_dropped() {
        let (engine, store, _) = engine();
        engine
            .handle_frame(&frame("sparking-esp32/ibutton/delete_ready", json!({})))
            .unwrap();
        assert!(store.snapshot().delete.is_none());
    }

    #[tokio::test]
    async fn attach_registers_listener_and_mirrors_status() {
        let (engine, store, _) = engine();
        let transport: Arc<dyn PubSubTransport> = Arc::new(MockTransport::new());
        engine.attach(&transport);

        transport.disconnect().await.unwrap();
        // Let the mirror task observe the change.
        tokio::task::yield_now().await;
        let mut rx = store.subscribe();
        rx.wait_for(|snap| snap.connection == ConnectionStatus::Disconnected)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn frames_injected_through_transport_reach_the_store() {
        let (engine, store, _) = engine();
        let mock = Arc::new(MockTransport::new());
        let transport: Arc<dyn PubSubTransport> = mock.clone();
        engine.attach(&transport);

        mock.inject_frame(
            "sparking-esp32/status",
            br#"{"online": true, "occupancy": 1, "total_spaces": 2}"#,
        );

        let snap = store.snapshot();
        assert!(snap.device.online);
        assert_eq!(snap.device.total, 2);
    }
}
