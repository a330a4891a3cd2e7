// SPDX-FileCopyrightText: 2026 Parkwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Topic namespace shared between the transport and the router.
//!
//! All constants are sub-paths relative to the configured namespace root;
//! the transport prefixes the root on subscribe and publish.

/// Controller status snapshot messages.
pub const STATUS: &str = "status";

/// Device acknowledged a pairing request and awaits the physical token.
pub const PAIRING_READY: &str = "pairing/ready_for_ibutton";
/// Pairing completed.
pub const PAIRING_SUCCESS: &str = "pairing/success";
/// Pairing failed; payload carries a `reason` field.
pub const PAIRING_FAILURE: &str = "pairing/failure";

/// Device-initiated two-factor entry request.
pub const TWO_FACTOR_REQUEST: &str = "auth/2fa_request";

/// Device entered delete mode and awaits the physical token.
pub const DELETE_READY: &str = "ibutton/delete_ready";
/// Token deletion completed.
pub const DELETE_SUCCESS: &str = "ibutton/delete_success";
/// Token deletion failed.
pub const DELETE_FAILURE: &str = "ibutton/delete_failure";

/// Start a pairing conversation; payload `{pairing_session_id}`.
pub const CMD_INITIATE_PAIRING: &str = "cmd/initiate_pairing";
/// Best-effort pairing cancel; payload `{pairing_session_id}`.
pub const CMD_CANCEL_PAIRING: &str = "cmd/cancel_pairing";
/// Answer a two-factor request; payload `{ibutton_id, allow_entry, device_id}`.
pub const CMD_TWO_FACTOR_RESPONSE: &str = "cmd/auth/2fa_response";
/// Put the controller into token-delete mode.
pub const CMD_INITIATE_DELETE: &str = "cmd/ibutton/initiate_delete_mode";

/// Topic filters (re-)subscribed on every successful connect, at-most-once
/// delivery. The wildcards cover all pairing and token-deletion sub-topics.
pub const SUBSCRIPTION_FILTERS: &[&str] =
    &[STATUS, "pairing/#", TWO_FACTOR_REQUEST, "ibutton/#"];

/// Joins the namespace root and a relative sub-topic, tolerating stray
/// slashes on either side.
pub fn full_topic(root: &str, sub_topic: &str) -> String {
    let root = root.trim_end_matches('/');
    let sub = sub_topic.trim_start_matches('/');
    if root.is_empty() {
        sub.to_string()
    } else {
        format!("{root}/{sub}")
    }
}
