// SPDX-FileCopyrightText: 2026 Parkwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits consumed by the session layer.

pub mod alert;
pub mod confirm;
pub mod notify;
pub mod transport;

pub use alert::AlertSink;
pub use confirm::ConfirmationGate;
pub use notify::EntryNotifier;
pub use transport::{FrameListener, PubSubTransport};
