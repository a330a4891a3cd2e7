// SPDX-FileCopyrightText: 2026 Parkwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the complete session stack over mock
//! collaborators: transport, store, engine, and gateway, wired the same
//! way the binary wires the real ones. Provides `device_sends()` to drive
//! inbound frames through the full pipeline in tests.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use parkwatch_core::traits::{AlertSink, ConfirmationGate, EntryNotifier, PubSubTransport};
use parkwatch_session::{ActionGateway, SessionEngine, SessionStore};

use crate::mock_gate::MockGate;
use crate::mock_transport::MockTransport;
use crate::recorders::{RecordingAlerts, RecordingNotifier};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    gate: MockGate,
    root: String,
    device_id: String,
    ready_wait: Duration,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            gate: MockGate::approving(),
            root: "sparking-esp32".to_string(),
            device_id: "ESP32_Parking_01".to_string(),
            ready_wait: Duration::from_secs(5),
        }
    }

    /// Replace the default approving gate with a scripted one.
    pub fn with_gate(mut self, gate: MockGate) -> Self {
        self.gate = gate;
        self
    }

    /// Override the topic namespace root.
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Override the soft ready-wait window.
    pub fn with_ready_wait(mut self, ready_wait: Duration) -> Self {
        self.ready_wait = ready_wait;
        self
    }

    /// Build the harness, wiring store, engine, and gateway over the mocks.
    pub fn build(self) -> TestHarness {
        let transport = Arc::new(MockTransport::new());
        let store = Arc::new(SessionStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let engine = Arc::new(SessionEngine::new(
            Arc::clone(&store),
            notifier.clone() as Arc<dyn EntryNotifier>,
        ));
        let transport_dyn: Arc<dyn PubSubTransport> = transport.clone();
        engine.attach(&transport_dyn);

        let gate = Arc::new(self.gate);
        let alerts = Arc::new(RecordingAlerts::new());
        let gateway = ActionGateway::new(
            transport_dyn,
            Arc::clone(&store),
            gate.clone() as Arc<dyn ConfirmationGate>,
            alerts.clone() as Arc<dyn AlertSink>,
            self.device_id,
            self.ready_wait,
        );

        TestHarness {
            transport,
            store,
            gateway,
            gate,
            alerts,
            notifier,
            root: self.root,
        }
    }
}

/// A complete test environment: mock transport, live store, engine, and
/// gateway, plus capture-only presentation sinks for assertions.
pub struct TestHarness {
    /// The mock broker transport.
    pub transport: Arc<MockTransport>,
    /// The session store shared by engine and gateway.
    pub store: Arc<SessionStore>,
    /// The action gateway under test.
    pub gateway: ActionGateway,
    /// The scripted confirmation gate.
    pub gate: Arc<MockGate>,
    /// Captured alerts.
    pub alerts: Arc<RecordingAlerts>,
    /// Captured entry-request notifications.
    pub notifier: Arc<RecordingNotifier>,
    root: String,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A harness with all defaults.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Injects a device frame with a JSON payload under the namespace root.
    pub fn device_sends(&self, sub_topic: &str, payload: Value) {
        self.transport.inject_frame(
            &format!("{}/{sub_topic}", self.root),
            payload.to_string().as_bytes(),
        );
    }

    /// Injects a device frame with raw (possibly undecodable) bytes.
    pub fn device_sends_raw(&self, sub_topic: &str, payload: &[u8]) {
        self.transport
            .inject_frame(&format!("{}/{sub_topic}", self.root), payload);
    }

    /// The correlation id of the active pairing conversation.
    ///
    /// # Panics
    ///
    /// Panics when no pairing conversation is active.
    pub fn pairing_session_id(&self) -> String {
        self.store
            .snapshot()
            .pairing
            .expect("active pairing conversation")
            .correlation_id
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use parkwatch_core::types::ConversationState;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn builder_creates_working_environment() {
        let harness = TestHarness::new();
        harness.device_sends("status", json!({"online": true, "total_spaces": 4}));
        assert!(harness.store.snapshot().device.online);
    }

    #[tokio::test]
    async fn harness_drives_a_full_pairing_exchange() {
        let harness = TestHarness::new();
        assert!(harness.gateway.start_pairing().await.unwrap());

        let session_id = harness.pairing_session_id();
        harness.device_sends(
            "pairing/ready_for_ibutton",
            json!({"pairing_session_id": session_id}),
        );

        assert_eq!(
            harness.store.snapshot().pairing.as_ref().unwrap().state,
            ConversationState::Ready
        );
        assert_eq!(harness.transport.published_count(), 1);
    }

    #[tokio::test]
    async fn with_root_prefixes_injected_frames() {
        let harness = TestHarness::builder().with_root("garage-7").build();
        harness.device_sends("status", json!({"online": true}));
        assert!(harness
            .store
            .snapshot()
            .last_frame
            .unwrap()
            .topic
            .starts_with("garage-7/"));
    }
}
