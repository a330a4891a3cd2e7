// SPDX-FileCopyrightText: 2026 Parkwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local alert surface trait.

/// Fire-and-forget presentation of user-visible notices. The session layer
/// only calls into it and never reads state back.
pub trait AlertSink: Send + Sync {
    /// Shows a titled notice.
    fn alert(&self, title: &str, body: &str);
}
