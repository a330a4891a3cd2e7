// SPDX-FileCopyrightText: 2026 Parkwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parkwatch pair` and `parkwatch delete` command implementations.
//!
//! Both drive a gateway conversation from the terminal: confirm, publish
//! the initiate command, then follow the conversation's status line until
//! it reaches a terminal state or the user interrupts.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use parkwatch_config::model::ParkwatchConfig;
use parkwatch_core::traits::{AlertSink, ConfirmationGate};
use parkwatch_core::types::{ConnectionStatus, ConversationKind};
use parkwatch_core::ParkwatchError;
use parkwatch_session::ActionGateway;

use crate::serve;
use crate::shims::{ConsoleAlerts, ConsoleGate};

/// How long to wait for the initial broker connection before giving up.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Copy)]
enum Flow {
    Pair,
    Delete,
}

impl Flow {
    fn kind(self) -> ConversationKind {
        match self {
            Flow::Pair => ConversationKind::Pairing,
            Flow::Delete => ConversationKind::DeleteToken,
        }
    }
}

pub async fn run_pair(config: ParkwatchConfig) -> Result<(), ParkwatchError> {
    run_flow(config, Flow::Pair).await
}

pub async fn run_delete(config: ParkwatchConfig) -> Result<(), ParkwatchError> {
    run_flow(config, Flow::Delete).await
}

async fn run_flow(config: ParkwatchConfig, flow: Flow) -> Result<(), ParkwatchError> {
    serve::init_tracing(&config.app.log_level);

    let stack = serve::wire(&config);
    stack.transport.connect().await?;

    let mut status_rx = stack.transport.watch_status();
    tokio::time::timeout(
        CONNECT_TIMEOUT,
        status_rx.wait_for(|s| *s == ConnectionStatus::Connected),
    )
    .await
    .map_err(|_| ParkwatchError::Transport {
        message: "timed out waiting for broker connection".into(),
        source: None,
    })?
    .map_err(|_| ParkwatchError::NotConnected)?;

    let gateway = ActionGateway::new(
        Arc::clone(&stack.transport),
        Arc::clone(&stack.store),
        Arc::new(ConsoleGate) as Arc<dyn ConfirmationGate>,
        Arc::new(ConsoleAlerts) as Arc<dyn AlertSink>,
        config.controller.device_id.clone(),
        Duration::from_secs(config.flows.ready_wait_secs),
    );

    let started = match flow {
        Flow::Pair => gateway.start_pairing().await?,
        Flow::Delete => gateway.start_delete().await?,
    };
    if !started {
        stack.transport.disconnect().await?;
        return Ok(());
    }

    follow_conversation(&stack, &gateway, flow).await?;

    stack.transport.disconnect().await?;
    Ok(())
}

/// Prints the conversation's status line as it changes, until the
/// conversation ends or the user interrupts with Ctrl+C.
async fn follow_conversation(
    stack: &serve::Stack,
    gateway: &ActionGateway,
    flow: Flow,
) -> Result<(), ParkwatchError> {
    let shutdown = serve::install_signal_handler();
    let mut rx = stack.store.subscribe();
    let mut last_message = String::new();

    loop {
        let snap = rx.borrow_and_update().clone();
        match snap.conversation(flow.kind()) {
            Some(conversation) => {
                if conversation.message != last_message {
                    println!("{}", conversation.message);
                    last_message.clone_from(&conversation.message);
                }
                if conversation.state.is_terminal() {
                    info!(state = %conversation.state, "conversation finished");
                    break;
                }
            }
            // Cleared from elsewhere; nothing left to follow.
            None => break,
        }

        tokio::select! {
            _ = shutdown.cancelled() => {
                match flow {
                    Flow::Pair => gateway.cancel_pairing().await?,
                    Flow::Delete => gateway.cancel_delete(),
                }
                println!("Cancelled.");
                break;
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    Ok(())
}
