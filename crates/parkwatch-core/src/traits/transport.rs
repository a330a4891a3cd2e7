// SPDX-FileCopyrightText: 2026 Parkwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport trait for the shared publish/subscribe broker connection.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;

use crate::error::ParkwatchError;
use crate::types::{ConnectionStatus, InboundFrame};

/// A registered inbound-frame consumer.
///
/// Listeners are invoked from the transport's event-loop task, once per
/// frame, in stable registration order. A returned error is logged by the
/// transport and does not prevent delivery to later listeners.
pub type FrameListener =
    Arc<dyn Fn(&InboundFrame) -> Result<(), ParkwatchError> + Send + Sync>;

/// Owner of the single physical connection to the pub/sub broker.
///
/// Implementations prefix the configured namespace root on publish and
/// re-subscribe the fixed topic filter set on every successful connect.
#[async_trait]
pub trait PubSubTransport: Send + Sync {
    /// Establishes the connection. No-op when already connected. Generates
    /// a fresh random client identifier per attempt, and keeps retrying
    /// with a fixed backoff on unsolicited disconnects until
    /// [`disconnect`](PubSubTransport::disconnect) is called.
    async fn connect(&self) -> Result<(), ParkwatchError>;

    /// Tears down the connection. Idempotent.
    async fn disconnect(&self) -> Result<(), ParkwatchError>;

    /// Publishes to a sub-topic under the namespace root. String payloads
    /// are sent raw; anything else is serialized to JSON. Fails with
    /// [`ParkwatchError::NotConnected`] when there is no active connection.
    async fn publish(&self, sub_topic: &str, payload: &Value) -> Result<(), ParkwatchError>;

    /// Current connection status.
    fn status(&self) -> ConnectionStatus;

    /// Observable connection status; the connect/disconnect callback
    /// surface for interested consumers.
    fn watch_status(&self) -> watch::Receiver<ConnectionStatus>;

    /// Registers a frame listener under a unique key. Registering under a
    /// key already in use replaces the previous listener rather than
    /// stacking it.
    fn add_listener(&self, id: &str, listener: FrameListener);

    /// Removes a previously registered listener. No-op for unknown keys.
    fn remove_listener(&self, id: &str);
}
