// SPDX-FileCopyrightText: 2026 Parkwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Confirmation capability trait (biometric challenge or equivalent).

use async_trait::async_trait;

use crate::error::ParkwatchError;

/// External yes/no confirmation step gating privileged outbound commands.
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    /// Presents a challenge with a human-readable prompt and resolves to
    /// whether the user passed it.
    ///
    /// Returns [`ParkwatchError::Confirmation`] when the capability is
    /// unsupported or not configured; callers treat that as a denial.
    async fn challenge(&self, prompt: &str) -> Result<bool, ParkwatchError>;
}
