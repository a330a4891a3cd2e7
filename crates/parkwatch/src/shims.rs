// SPDX-FileCopyrightText: 2026 Parkwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal-backed implementations of the session layer's presentation
//! and confirmation traits.

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use parkwatch_core::traits::{AlertSink, ConfirmationGate, EntryNotifier};
use parkwatch_core::types::associated_id_text;
use parkwatch_core::ParkwatchError;

/// Confirmation gate that asks a yes/no question on the terminal.
///
/// Stands in for the biometric challenge of a handheld client: the
/// operator at the terminal is the trusted party.
pub struct ConsoleGate;

#[async_trait]
impl ConfirmationGate for ConsoleGate {
    async fn challenge(&self, prompt: &str) -> Result<bool, ParkwatchError> {
        println!("{prompt} [y/N] ");
        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        reader
            .read_line(&mut line)
            .await
            .map_err(|e| ParkwatchError::Confirmation(format!("terminal unavailable: {e}")))?;
        Ok(matches!(line.trim(), "y" | "Y" | "yes"))
    }
}

/// Alert sink that prints notices to the terminal.
pub struct ConsoleAlerts;

impl AlertSink for ConsoleAlerts {
    fn alert(&self, title: &str, body: &str) {
        println!("[{title}] {body}");
    }
}

/// Entry notifier that surfaces requests through the log stream.
pub struct LogNotifier;

impl EntryNotifier for LogNotifier {
    fn notify_entry_request(&self, ibutton_id: &str, associated_id: &Value) {
        info!(
            ibutton_id,
            associated_id = associated_id_text(associated_id).as_str(),
            "entry request pending, run the client UI to respond"
        );
    }
}
