// SPDX-FileCopyrightText: 2026 Parkwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport for deterministic testing.
//!
//! `MockTransport` implements `PubSubTransport` with injectable inbound
//! frames and captured outbound publishes for assertion in tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;
use tracing::warn;

use parkwatch_core::error::ParkwatchError;
use parkwatch_core::traits::transport::{FrameListener, PubSubTransport};
use parkwatch_core::types::{ConnectionStatus, InboundFrame};

/// A mock broker transport for testing.
///
/// Provides two surfaces:
/// - **inject_frame()**: delivers a frame to every registered listener,
///   exactly as the real event loop would
/// - **published()**: captures every `(sub_topic, payload)` pair passed to
///   `publish()` for assertion
pub struct MockTransport {
    listeners: Mutex<Vec<(String, FrameListener)>>,
    published: Mutex<Vec<(String, Value)>>,
    status_tx: watch::Sender<ConnectionStatus>,
    fail_publish: AtomicBool,
}

impl MockTransport {
    /// Creates a mock transport that starts out connected.
    pub fn new() -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::Connected);
        Self {
            listeners: Mutex::new(Vec::new()),
            published: Mutex::new(Vec::new()),
            status_tx,
            fail_publish: AtomicBool::new(false),
        }
    }

    /// Creates a mock transport that starts out disconnected.
    pub fn disconnected() -> Self {
        let transport = Self::new();
        transport.set_status(ConnectionStatus::Disconnected);
        transport
    }

    /// Overrides the reported connection status and notifies watchers.
    pub fn set_status(&self, status: ConnectionStatus) {
        self.status_tx.send_replace(status);
    }

    /// Makes every subsequent `publish()` fail with a transport error.
    pub fn fail_publishes(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Delivers a frame to all registered listeners in registration order.
    ///
    /// Listener errors are logged and do not stop delivery, matching the
    /// real event loop's isolation behavior.
    pub fn inject_frame(&self, topic: &str, payload: &[u8]) {
        let frame = InboundFrame::new(topic, payload);
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        for (id, listener) in listeners.iter() {
            if let Err(e) = listener(&frame) {
                warn!(listener = id.as_str(), error = %e, "mock listener failed");
            }
        }
    }

    /// All captured publishes, in order.
    pub fn published(&self) -> Vec<(String, Value)> {
        self.published
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Count of captured publishes.
    pub fn published_count(&self) -> usize {
        self.published
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PubSubTransport for MockTransport {
    async fn connect(&self) -> Result<(), ParkwatchError> {
        self.set_status(ConnectionStatus::Connected);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ParkwatchError> {
        self.set_status(ConnectionStatus::Disconnected);
        Ok(())
    }

    async fn publish(&self, sub_topic: &str, payload: &Value) -> Result<(), ParkwatchError> {
        if self.status() != ConnectionStatus::Connected {
            return Err(ParkwatchError::NotConnected);
        }
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(ParkwatchError::Transport {
                message: format!("mock publish failure on {sub_topic}"),
                source: None,
            });
        }
        self.published
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((sub_topic.to_string(), payload.clone()));
        Ok(())
    }

    fn status(&self) -> ConnectionStatus {
        *self.status_tx.borrow()
    }

    fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    fn add_listener(&self, id: &str, listener: FrameListener) {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(slot) = listeners.iter_mut().find(|(key, _)| key == id) {
            slot.1 = listener;
        } else {
            listeners.push((id.to_string(), listener));
        }
    }

    fn remove_listener(&self, id: &str) {
        self.listeners
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .retain(|(key, _)| key != id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn publish_is_captured_in_order() {
        let transport = MockTransport::new();
        transport
            .publish("cmd/a", &serde_json::json!({"n": 1}))
            .await
            .unwrap();
        transport
            .publish("cmd/b", &serde_json::json!({"n": 2}))
            .await
            .unwrap();

        let published = transport.published();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].0, "cmd/a");
        assert_eq!(published[1].0, "cmd/b");
    }

    #[tokio::test]
    async fn publish_while_disconnected_is_rejected() {
        let transport = MockTransport::disconnected();
        let err = transport
            .publish("cmd/a", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ParkwatchError::NotConnected));
        assert_eq!(transport.published_count(), 0);
    }

    #[test]
    fn inject_frame_fans_out_to_all_listeners() {
        let transport = MockTransport::new();
        let hits = Arc::new(AtomicUsize::new(0));

        for id in ["a", "b"] {
            let hits = hits.clone();
            transport.add_listener(
                id,
                Arc::new(move |_frame| {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            );
        }

        transport.inject_frame("park/status", b"{}");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn duplicate_listener_key_replaces() {
        let transport = MockTransport::new();
        let hits = Arc::new(AtomicUsize::new(0));

        transport.add_listener("same", Arc::new(|_| Ok(())));
        {
            let hits = hits.clone();
            transport.add_listener(
                "same",
                Arc::new(move |_frame| {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            );
        }

        assert_eq!(transport.listener_count(), 1);
        transport.inject_frame("park/status", b"{}");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failing_listener_does_not_stop_later_listeners() {
        let transport = MockTransport::new();
        let hits = Arc::new(AtomicUsize::new(0));

        transport.add_listener(
            "bad",
            Arc::new(|_| Err(ParkwatchError::Internal("boom".into()))),
        );
        {
            let hits = hits.clone();
            transport.add_listener(
                "good",
                Arc::new(move |_frame| {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            );
        }

        transport.inject_frame("park/status", b"{}");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn watch_status_observes_transitions() {
        let transport = MockTransport::disconnected();
        let mut rx = transport.watch_status();
        assert_eq!(*rx.borrow(), ConnectionStatus::Disconnected);

        transport.connect().await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), ConnectionStatus::Connected);
    }
}
