// SPDX-FileCopyrightText: 2026 Parkwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parkwatch serve` command implementation.
//!
//! Connects to the broker, attaches the session engine, and logs
//! controller status until interrupted. The connection is torn down
//! gracefully on SIGINT/SIGTERM.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use parkwatch_config::model::ParkwatchConfig;
use parkwatch_core::traits::{EntryNotifier, PubSubTransport};
use parkwatch_core::ParkwatchError;
use parkwatch_mqtt::MqttTransport;
use parkwatch_session::{SessionEngine, SessionStore};

use crate::shims::LogNotifier;

/// The wired inbound stack shared by the serve and flow commands.
pub struct Stack {
    pub transport: Arc<dyn PubSubTransport>,
    pub store: Arc<SessionStore>,
}

/// Builds the transport, store, and engine, and wires them together.
pub fn wire(config: &ParkwatchConfig) -> Stack {
    let transport: Arc<dyn PubSubTransport> = Arc::new(MqttTransport::new(
        config.broker.clone(),
        config.topics.root.clone(),
    ));
    let store = Arc::new(SessionStore::new());
    let engine = Arc::new(SessionEngine::new(
        Arc::clone(&store),
        Arc::new(LogNotifier) as Arc<dyn EntryNotifier>,
    ));
    engine.attach(&transport);
    Stack { transport, store }
}

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal
/// is received.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT, shutting down"),
                        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                    }
                }
                Err(_) => {
                    let _ = ctrl_c.await;
                    info!("received SIGINT, shutting down");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, shutting down");
        }

        token_clone.cancel();
    });

    token
}

/// Runs the `parkwatch serve` command: a headless monitor of the
/// controller's status and conversation topics.
pub async fn run_serve(config: ParkwatchConfig) -> Result<(), ParkwatchError> {
    init_tracing(&config.app.log_level);
    info!(
        broker = config.broker.host.as_str(),
        root = config.topics.root.as_str(),
        "starting parkwatch serve"
    );

    let stack = wire(&config);
    stack.transport.connect().await?;

    let shutdown = install_signal_handler();
    let mut rx = stack.store.subscribe();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snap = rx.borrow_and_update().clone();
                info!(
                    connection = %snap.connection,
                    online = snap.device.online,
                    occupied = snap.device.occupied,
                    total = snap.device.total,
                    "state changed"
                );
                if let Some(frame) = &snap.last_frame {
                    debug!(topic = frame.topic.as_str(), text = frame.text.as_str(), "last frame");
                }
            }
        }
    }

    stack.transport.disconnect().await?;
    info!("parkwatch serve stopped");
    Ok(())
}

/// Initializes the tracing subscriber from the configured log level,
/// honoring `RUST_LOG` when set.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("parkwatch={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
