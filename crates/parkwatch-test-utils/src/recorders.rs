// SPDX-FileCopyrightText: 2026 Parkwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capture-only alert and notification sinks for testing.

use std::sync::Mutex;

use serde_json::Value;

use parkwatch_core::traits::alert::AlertSink;
use parkwatch_core::traits::notify::EntryNotifier;

/// An `AlertSink` that records every `(title, body)` pair.
#[derive(Default)]
pub struct RecordingAlerts {
    alerts: Mutex<Vec<(String, String)>>,
}

impl RecordingAlerts {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded alerts, in order.
    pub fn alerts(&self) -> Vec<(String, String)> {
        self.alerts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub fn alert_count(&self) -> usize {
        self.alerts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

impl AlertSink for RecordingAlerts {
    fn alert(&self, title: &str, body: &str) {
        self.alerts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((title.to_string(), body.to_string()));
    }
}

/// An `EntryNotifier` that records every entry-request notification.
#[derive(Default)]
pub struct RecordingNotifier {
    notified: Mutex<Vec<(String, Value)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded `(ibutton_id, associated_id)` pairs, in order.
    pub fn notifications(&self) -> Vec<(String, Value)> {
        self.notified
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub fn notification_count(&self) -> usize {
        self.notified
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

impl EntryNotifier for RecordingNotifier {
    fn notify_entry_request(&self, ibutton_id: &str, associated_id: &Value) {
        self.notified
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((ibutton_id.to_string(), associated_id.clone()));
    }
}
