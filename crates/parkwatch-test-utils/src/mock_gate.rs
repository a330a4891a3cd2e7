// SPDX-FileCopyrightText: 2026 Parkwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted confirmation gate for testing.

use std::sync::Mutex;

use async_trait::async_trait;

use parkwatch_core::error::ParkwatchError;
use parkwatch_core::traits::confirm::ConfirmationGate;

/// What a scripted challenge resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Pass,
    Deny,
    Unavailable,
}

/// A confirmation gate with a fixed scripted outcome.
///
/// Every prompt passed to `challenge()` is recorded for assertion.
pub struct MockGate {
    outcome: Outcome,
    prompts: Mutex<Vec<String>>,
}

impl MockGate {
    /// A gate that passes every challenge.
    pub fn approving() -> Self {
        Self::with_outcome(Outcome::Pass)
    }

    /// A gate that denies every challenge.
    pub fn denying() -> Self {
        Self::with_outcome(Outcome::Deny)
    }

    /// A gate whose capability is unavailable, resolving every challenge
    /// to a `Confirmation` error.
    pub fn unavailable() -> Self {
        Self::with_outcome(Outcome::Unavailable)
    }

    fn with_outcome(outcome: Outcome) -> Self {
        Self {
            outcome,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// All prompts presented so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Number of challenges presented so far.
    pub fn challenge_count(&self) -> usize {
        self.prompts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl ConfirmationGate for MockGate {
    async fn challenge(&self, prompt: &str) -> Result<bool, ParkwatchError> {
        self.prompts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(prompt.to_string());
        match self.outcome {
            Outcome::Pass => Ok(true),
            Outcome::Deny => Ok(false),
            Outcome::Unavailable => Err(ParkwatchError::Confirmation(
                "no confirmation hardware".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn approving_gate_records_prompt_and_passes() {
        let gate = MockGate::approving();
        assert!(gate.challenge("do the thing").await.unwrap());
        assert_eq!(gate.prompts(), vec!["do the thing".to_string()]);
    }

    #[tokio::test]
    async fn denying_gate_fails_challenge() {
        let gate = MockGate::denying();
        assert!(!gate.challenge("do the thing").await.unwrap());
        assert_eq!(gate.challenge_count(), 1);
    }

    #[tokio::test]
    async fn unavailable_gate_errors() {
        let gate = MockGate::unavailable();
        let err = gate.challenge("do the thing").await.unwrap_err();
        assert!(matches!(err, ParkwatchError::Confirmation(_)));
    }
}
