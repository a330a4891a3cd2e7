// SPDX-FileCopyrightText: 2026 Parkwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Parkwatch smart-parking client.
//!
//! This crate provides the error type, common types, topic namespace, and
//! collaborator trait definitions used throughout the Parkwatch workspace.
//! The transport, confirmation, alert, and notification implementations
//! all live in sibling crates and implement traits defined here.

pub mod error;
pub mod topics;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ParkwatchError;
pub use types::{
    ConnectionStatus, Conversation, ConversationKind, ConversationState, DeviceStatus,
    FrameLog, InboundFrame, Prompt, PromptAction, PromptEffect,
};

// Re-export all collaborator traits at crate root.
pub use traits::{AlertSink, ConfirmationGate, EntryNotifier, FrameListener, PubSubTransport};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parkwatch_error_has_all_variants() {
        let _config = ParkwatchError::Config("test".into());
        let _transport = ParkwatchError::Transport {
            message: "test".into(),
            source: Some(Box::new(std::io::Error::other("test"))),
        };
        let _not_connected = ParkwatchError::NotConnected;
        let _confirmation = ParkwatchError::Confirmation("no hardware".into());
        let _internal = ParkwatchError::Internal("test".into());
    }

    #[test]
    fn error_display_is_prefixed() {
        let e = ParkwatchError::Config("bad root".into());
        assert_eq!(e.to_string(), "configuration error: bad root");

        let e = ParkwatchError::NotConnected;
        assert_eq!(e.to_string(), "not connected to broker");
    }

    #[test]
    fn all_trait_modules_are_exported() {
        // Compile-time check that the collaborator traits are accessible
        // through the public API.
        fn _assert_transport<T: PubSubTransport>() {}
        fn _assert_gate<T: ConfirmationGate>() {}
        fn _assert_alerts<T: AlertSink>() {}
        fn _assert_notifier<T: EntryNotifier>() {}
    }
}
