// SPDX-FileCopyrightText: 2026 Parkwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound side of the session layer.
//!
//! The gateway is the only component that publishes commands. Privileged
//! commands (starting pairing, starting deletion, answering an entry
//! request either way) pass through the [`ConfirmationGate`] first; a
//! failed or unavailable challenge leaves the store untouched and
//! publishes nothing.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, warn};

use parkwatch_core::topics;
use parkwatch_core::traits::alert::AlertSink;
use parkwatch_core::traits::confirm::ConfirmationGate;
use parkwatch_core::traits::transport::PubSubTransport;
use parkwatch_core::types::{ConversationKind, PromptEffect};
use parkwatch_core::ParkwatchError;

use crate::store::SessionStore;

/// User-driven entry points into the session layer.
pub struct ActionGateway {
    transport: Arc<dyn PubSubTransport>,
    store: Arc<SessionStore>,
    gate: Arc<dyn ConfirmationGate>,
    alerts: Arc<dyn AlertSink>,
    device_id: String,
    ready_wait: Duration,
}

impl ActionGateway {
    pub fn new(
        transport: Arc<dyn PubSubTransport>,
        store: Arc<SessionStore>,
        gate: Arc<dyn ConfirmationGate>,
        alerts: Arc<dyn AlertSink>,
        device_id: impl Into<String>,
        ready_wait: Duration,
    ) -> Self {
        Self {
            transport,
            store,
            gate,
            alerts,
            device_id: device_id.into(),
            ready_wait,
        }
    }

    /// Starts a pairing conversation.
    ///
    /// Returns `Ok(false)` when the confirmation challenge is not passed;
    /// nothing is published and no state changes in that case. A publish
    /// failure after confirmation moves the fresh conversation to `Failed`.
    pub async fn start_pairing(&self) -> Result<bool, ParkwatchError> {
        if !self.confirm("Confirm to pair a new iButton").await? {
            self.alerts
                .alert("Pairing", "Confirmation failed. Pairing was not started.");
            return Ok(false);
        }

        let session_id = uuid::Uuid::new_v4().to_string();
        let generation = self.store.begin(
            ConversationKind::Pairing,
            &session_id,
            "Contacting the device...",
        );
        info!(session_id = session_id.as_str(), "pairing initiated");

        let payload = json!({
            "pairing_session_id": session_id,
            "device_id": self.device_id,
        });
        if let Err(e) = self
            .transport
            .publish(topics::CMD_INITIATE_PAIRING, &payload)
            .await
        {
            self.store.mark_failed(
                ConversationKind::Pairing,
                Some(&session_id),
                "Could not reach the device.",
                None,
            );
            return Err(e);
        }

        self.arm_soft_timer(
            ConversationKind::Pairing,
            generation,
            "The device is taking longer than expected...",
        );
        Ok(true)
    }

    /// Cancels the active pairing conversation.
    ///
    /// The cancel command is best effort: a publish failure is logged and
    /// the local conversation is cleared regardless.
    pub async fn cancel_pairing(&self) -> Result<(), ParkwatchError> {
        let Some(conversation) = self.store.snapshot().pairing else {
            return Ok(());
        };

        let payload = json!({
            "pairing_session_id": conversation.correlation_id,
            "device_id": self.device_id,
        });
        if let Err(e) = self
            .transport
            .publish(topics::CMD_CANCEL_PAIRING, &payload)
            .await
        {
            warn!(error = %e, "pairing cancel publish failed, clearing locally");
        }

        self.store.clear(ConversationKind::Pairing);
        info!(
            session_id = conversation.correlation_id.as_str(),
            "pairing cancelled"
        );
        Ok(())
    }

    /// Puts the controller into token-delete mode.
    ///
    /// Same confirmation and failure semantics as [`start_pairing`](Self::start_pairing).
    pub async fn start_delete(&self) -> Result<bool, ParkwatchError> {
        if !self.confirm("Confirm to delete an iButton").await? {
            self.alerts
                .alert("Delete iButton", "Confirmation failed. Delete mode was not started.");
            return Ok(false);
        }

        let session_id = uuid::Uuid::new_v4().to_string();
        let generation = self.store.begin(
            ConversationKind::DeleteToken,
            &session_id,
            "Contacting the device...",
        );
        info!(session_id = session_id.as_str(), "delete mode initiated");

        let payload = json!({
            "delete_session_id": session_id,
            "device_id": self.device_id,
        });
        if let Err(e) = self
            .transport
            .publish(topics::CMD_INITIATE_DELETE, &payload)
            .await
        {
            self.store.mark_failed(
                ConversationKind::DeleteToken,
                Some(&session_id),
                "Could not reach the device.",
                None,
            );
            return Err(e);
        }

        self.arm_soft_timer(
            ConversationKind::DeleteToken,
            generation,
            "The device is taking longer than expected...",
        );
        Ok(true)
    }

    /// Abandons the active delete conversation locally. The namespace has
    /// no cancel command for delete mode; the device falls back to normal
    /// operation on its own timeout.
    pub fn cancel_delete(&self) {
        if self.store.clear(ConversationKind::DeleteToken) {
            info!("delete conversation cleared");
        }
    }

    /// Resolves the pending two-factor prompt with the chosen effect.
    ///
    /// Both answers pass through the confirmation gate; a failed challenge
    /// keeps the prompt pending and returns `Ok(false)`. Only dismissal is
    /// unprivileged, since it sends nothing to the device.
    pub async fn resolve_prompt(&self, effect: PromptEffect) -> Result<bool, ParkwatchError> {
        match effect {
            PromptEffect::AllowEntry { ibutton_id, .. } => {
                let prompt = format!("Confirm to allow entry for iButton {ibutton_id}");
                if !self.confirm(&prompt).await? {
                    self.alerts
                        .alert("Entry Request", "Confirmation failed. Entry was not allowed.");
                    return Ok(false);
                }
                self.publish_two_factor_response(&ibutton_id, true).await?;
                self.store.clear(ConversationKind::TwoFactorAuth);
                Ok(true)
            }
            PromptEffect::DenyEntry { ibutton_id, .. } => {
                let prompt = format!("Confirm to deny entry for iButton {ibutton_id}");
                if !self.confirm(&prompt).await? {
                    self.alerts
                        .alert("Entry Request", "Confirmation failed. No response was sent.");
                    return Ok(false);
                }
                self.publish_two_factor_response(&ibutton_id, false).await?;
                self.store.clear(ConversationKind::TwoFactorAuth);
                Ok(true)
            }
            PromptEffect::Dismiss => {
                debug!("entry prompt dismissed without response");
                self.store.clear(ConversationKind::TwoFactorAuth);
                Ok(true)
            }
        }
    }

    async fn publish_two_factor_response(
        &self,
        ibutton_id: &str,
        allow_entry: bool,
    ) -> Result<(), ParkwatchError> {
        let payload = json!({
            "ibutton_id": ibutton_id,
            "allow_entry": allow_entry,
            "device_id": self.device_id,
        });
        if let Err(e) = self
            .transport
            .publish(topics::CMD_TWO_FACTOR_RESPONSE, &payload)
            .await
        {
            self.alerts
                .alert("Entry Request", "Could not send the response.");
            return Err(e);
        }
        info!(ibutton_id, allow_entry, "two-factor response published");
        self.alerts.alert(
            "Entry Request",
            if allow_entry {
                "Entry allowed."
            } else {
                "Entry denied."
            },
        );
        Ok(())
    }

    /// Resolves a confirmation challenge, treating an unavailable
    /// capability as a denial.
    async fn confirm(&self, prompt: &str) -> Result<bool, ParkwatchError> {
        match self.gate.challenge(prompt).await {
            Ok(passed) => Ok(passed),
            Err(ParkwatchError::Confirmation(reason)) => {
                warn!(reason = reason.as_str(), "confirmation unavailable, denying");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Arms the advisory slow-device timer. Purely cosmetic: it updates
    /// the conversation's status line when the device has not acknowledged
    /// within the configured wait, and is a no-op once the conversation
    /// has advanced, been superseded, or been cleared.
    fn arm_soft_timer(&self, kind: ConversationKind, generation: u64, message: &str) {
        let store = Arc::clone(&self.store);
        let wait = self.ready_wait;
        let message = message.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            if store.mark_waiting(kind, generation, &message) {
                debug!(kind = %kind, "device slow to acknowledge");
            }
        });
    }
}
