// SPDX-FileCopyrightText: 2026 Parkwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Parkwatch client core.

use thiserror::Error;

/// The primary error type used across the Parkwatch session layer and its
/// collaborator traits.
#[derive(Debug, Error)]
pub enum ParkwatchError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport errors (broker connection, publish failure, malformed topic).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Publish attempted without an active broker connection. Rejected
    /// locally, never queued.
    #[error("not connected to broker")]
    NotConnected,

    /// Confirmation capability is unsupported or not configured on this
    /// device. Callers treat this the same as a denied challenge.
    #[error("confirmation unavailable: {0}")]
    Confirmation(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
