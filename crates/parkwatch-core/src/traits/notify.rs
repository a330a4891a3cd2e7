// SPDX-FileCopyrightText: 2026 Parkwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification trigger trait for device-initiated entry requests.

use serde_json::Value;

/// Schedules an immediate local notification for a two-factor entry
/// request. A tap on the notification re-enters the session layer through
/// the gateway's prompt resolution entry point, carrying the same
/// identifiers.
pub trait EntryNotifier: Send + Sync {
    /// Fires a notification for the given token and associated id.
    fn notify_entry_request(&self, ibutton_id: &str, associated_id: &Value);
}
