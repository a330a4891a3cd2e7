// SPDX-FileCopyrightText: 2026 Parkwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound frame handling for the Parkwatch client.
//!
//! Splits the inbound path into two pure stages: [`decode::decode_payload`]
//! turns raw bytes into a `serde_json::Value` (with an opaque-string
//! fallback), and [`classifier::classify`] turns a (topic, value) pair into
//! at most one typed [`classifier::DeviceEvent`]. Neither stage performs
//! I/O or mutates state; the session engine owns all side effects.

pub mod classifier;
pub mod decode;

pub use classifier::{classify, DeviceEvent};
pub use decode::decode_payload;
