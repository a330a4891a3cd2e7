// SPDX-FileCopyrightText: 2026 Parkwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! MQTT transport adapter for the Parkwatch client.
//!
//! Implements [`PubSubTransport`] over rumqttc: one shared broker
//! connection, a background event-loop task that fans inbound frames out
//! to registered listeners, and automatic resubscription of the fixed
//! filter set on every successful connect.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use parkwatch_config::model::BrokerConfig;
use parkwatch_core::error::ParkwatchError;
use parkwatch_core::topics::{full_topic, SUBSCRIPTION_FILTERS};
use parkwatch_core::traits::transport::{FrameListener, PubSubTransport};
use parkwatch_core::types::{ConnectionStatus, InboundFrame};

type ListenerRegistry = Arc<Mutex<Vec<(String, FrameListener)>>>;

/// Handles for an established connection, dropped on disconnect.
struct ActiveConnection {
    client: AsyncClient,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

/// The single shared MQTT connection.
///
/// `connect()` spawns an event-loop task that owns the rumqttc poll loop;
/// `disconnect()` cancels it. Listener registration and status inspection
/// are synchronous and connection-independent.
pub struct MqttTransport {
    config: BrokerConfig,
    root: String,
    status_tx: watch::Sender<ConnectionStatus>,
    listeners: ListenerRegistry,
    active: tokio::sync::Mutex<Option<ActiveConnection>>,
}

impl MqttTransport {
    /// Creates a disconnected transport for the given broker and topic root.
    pub fn new(config: BrokerConfig, root: impl Into<String>) -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::Disconnected);
        Self {
            config,
            root: root.into(),
            status_tx,
            listeners: Arc::new(Mutex::new(Vec::new())),
            active: tokio::sync::Mutex::new(None),
        }
    }

    /// The configured topic namespace root.
    pub fn root(&self) -> &str {
        &self.root
    }
}

#[async_trait]
impl PubSubTransport for MqttTransport {
    async fn connect(&self) -> Result<(), ParkwatchError> {
        let mut active = self.active.lock().await;
        if active.is_some() {
            debug!("connect called while already connected, ignoring");
            return Ok(());
        }

        let client_id = random_client_id(&self.config.client_id_prefix);
        info!(
            host = self.config.host.as_str(),
            port = self.config.port,
            client_id = client_id.as_str(),
            "connecting to broker"
        );

        let mut options = MqttOptions::new(client_id, &self.config.host, self.config.port);
        options.set_keep_alive(Duration::from_secs(self.config.keepalive_secs));

        let (client, mut eventloop) = AsyncClient::new(options, self.config.capacity);
        let cancel = CancellationToken::new();

        self.status_tx.send_replace(ConnectionStatus::Connecting);

        let task_cancel = cancel.clone();
        let task_client = client.clone();
        let status_tx = self.status_tx.clone();
        let listeners = Arc::clone(&self.listeners);
        let root = self.root.clone();
        let reconnect_delay = Duration::from_secs(self.config.reconnect_delay_secs);

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    event = eventloop.poll() => match event {
                        Ok(Event::Incoming(Packet::ConnAck(_))) => {
                            info!("broker connection established");
                            status_tx.send_replace(ConnectionStatus::Connected);
                            resubscribe(&task_client, &root).await;
                        }
                        Ok(Event::Incoming(Packet::Publish(publish))) => {
                            let frame =
                                InboundFrame::new(publish.topic.clone(), publish.payload.to_vec());
                            deliver(&listeners, &frame);
                        }
                        Ok(_) => {}
                        Err(e) => {
                            warn!(error = %e, "broker connection lost, retrying");
                            status_tx.send_replace(ConnectionStatus::Connecting);
                            tokio::select! {
                                _ = task_cancel.cancelled() => break,
                                _ = tokio::time::sleep(reconnect_delay) => {}
                            }
                        }
                    }
                }
            }
            debug!("event loop stopped");
        });

        *active = Some(ActiveConnection {
            client,
            cancel,
            task,
        });
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ParkwatchError> {
        let Some(connection) = self.active.lock().await.take() else {
            return Ok(());
        };
        info!("disconnecting from broker");
        // Best effort: the event loop is cancelled regardless.
        if let Err(e) = connection.client.disconnect().await {
            debug!(error = %e, "disconnect packet not sent");
        }
        connection.cancel.cancel();
        // The status watch goes to Disconnected only after the old task has
        // stopped, so a task from a later connect() cannot be outraced by
        // this one's final writes.
        if let Err(e) = connection.task.await {
            debug!(error = %e, "event loop task aborted");
        }
        self.status_tx.send_replace(ConnectionStatus::Disconnected);
        Ok(())
    }

    async fn publish(&self, sub_topic: &str, payload: &Value) -> Result<(), ParkwatchError> {
        if self.status() != ConnectionStatus::Connected {
            return Err(ParkwatchError::NotConnected);
        }
        let client = {
            let active = self.active.lock().await;
            match active.as_ref() {
                Some(connection) => connection.client.clone(),
                None => return Err(ParkwatchError::NotConnected),
            }
        };

        let topic = full_topic(&self.root, sub_topic);
        let body = encode_payload(payload);
        debug!(topic = topic.as_str(), bytes = body.len(), "publishing");
        client
            .publish(topic, QoS::AtMostOnce, false, body)
            .await
            .map_err(|e| ParkwatchError::Transport {
                message: format!("publish to {sub_topic} failed"),
                source: Some(Box::new(e)),
            })
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
            debug!(listener = id, "replacing listener with duplicate key");
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

/// Subscribes the fixed filter set under the namespace root. Failures are
/// logged per filter; a partially subscribed connection still delivers
/// what it can.
async fn resubscribe(client: &AsyncClient, root: &str) {
    for filter in SUBSCRIPTION_FILTERS {
        let topic = full_topic(root, filter);
        match client.subscribe(&topic, QoS::AtMostOnce).await {
            Ok(()) => debug!(topic = topic.as_str(), "subscribed"),
            Err(e) => warn!(topic = topic.as_str(), error = %e, "subscribe failed"),
        }
    }
}

/// Fans one frame out to every listener in registration order. A listener
/// error is logged and does not stop delivery to later listeners.
fn deliver(listeners: &ListenerRegistry, frame: &InboundFrame) {
    let listeners = listeners
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    for (id, listener) in listeners.iter() {
        if let Err(e) = listener(frame) {
            warn!(listener = id.as_str(), error = %e, "listener failed for frame");
        }
    }
}

/// A fresh client identifier: the configured prefix plus random hex.
fn random_client_id(prefix: &str) -> String {
    format!("{prefix}{:08x}", rand::random::<u32>())
}

/// String payloads go out raw; everything else is serialized to JSON.
fn encode_payload(payload: &Value) -> Vec<u8> {
    match payload {
        Value::String(s) => s.clone().into_bytes(),
        other => other.to_string().into_bytes(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;

    fn transport() -> MqttTransport {
        MqttTransport::new(BrokerConfig::default(), "sparking-esp32")
    }

    #[test]
    fn random_client_id_uses_prefix_and_varies() {
        let a = random_client_id("parkwatch_");
        let b = random_client_id("parkwatch_");
        assert!(a.starts_with("parkwatch_"));
        assert_eq!(a.len(), "parkwatch_".len() + 8);
        // Two draws colliding would be a one-in-four-billion event.
        assert_ne!(a, b);
    }

    #[test]
    fn encode_payload_sends_strings_raw() {
        assert_eq!(encode_payload(&json!("plain text")), b"plain text");
        assert_eq!(
            encode_payload(&json!({"allow_entry": false})),
            br#"{"allow_entry":false}"#
        );
    }

    #[test]
    fn listener_registration_replaces_duplicates() {
        let transport = transport();
        let hits = Arc::new(AtomicUsize::new(0));

        transport.add_listener("engine", Arc::new(|_| Ok(())));
        {
            let hits = hits.clone();
            transport.add_listener(
                "engine",
                Arc::new(move |_frame| {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            );
        }

        deliver(
            &transport.listeners,
            &InboundFrame::new("sparking-esp32/status", b"{}".to_vec()),
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remove_listener_is_noop_for_unknown_keys() {
        let transport = transport();
        transport.add_listener("engine", Arc::new(|_| Ok(())));
        transport.remove_listener("nonexistent");
        transport.remove_listener("engine");
        transport.remove_listener("engine");
        assert!(transport
            .listeners
            .lock()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn deliver_isolates_listener_errors() {
        let transport = transport();
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

        deliver(
            &transport.listeners,
            &InboundFrame::new("sparking-esp32/status", b"{}".to_vec()),
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn publish_without_connection_is_rejected() {
        let transport = transport();
        let err = transport
            .publish("cmd/initiate_pairing", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ParkwatchError::NotConnected));
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let transport = transport();
        transport.disconnect().await.unwrap();
        transport.disconnect().await.unwrap();
        assert_eq!(transport.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn reconnect_status_is_not_clobbered_by_the_previous_event_loop() {
        // Unroutable broker: the event loop spins in its retry path.
        let config = BrokerConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            ..Default::default()
        };
        let transport = MqttTransport::new(config, "sparking-esp32");

        transport.connect().await.unwrap();
        transport.disconnect().await.unwrap();
        assert_eq!(transport.status(), ConnectionStatus::Disconnected);

        // disconnect() waited for the first event loop to stop, so nothing
        // left over can rewind the second connection's status.
        transport.connect().await.unwrap();
        assert_eq!(transport.status(), ConnectionStatus::Connecting);
        for _ in 0..20 {
            tokio::task::yield_now().await;
            assert_ne!(transport.status(), ConnectionStatus::Disconnected);
        }

        transport.disconnect().await.unwrap();
        assert_eq!(transport.status(), ConnectionStatus::Disconnected);
    }
}
