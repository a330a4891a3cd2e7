// SPDX-FileCopyrightText: 2026 Parkwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payload decoding with opaque-string degradation.

use serde_json::Value;

/// Decodes a raw payload as JSON, falling back to an opaque string value
/// when the bytes are not valid JSON.
///
/// Never fails: a malformed payload degrades to `Value::String` of the
/// lossy UTF-8 text so the frame can still be logged and displayed.
pub fn decode_payload(bytes: &[u8]) -> Value {
    match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(_) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
    }
}
