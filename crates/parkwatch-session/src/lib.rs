// SPDX-FileCopyrightText: 2026 Parkwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session layer of the Parkwatch client.
//!
//! Three collaborating pieces around one observable [`store::SessionStore`]:
//!
//! - [`store`] - the snapshot, conversation slots, and all state mutation
//! - [`engine`] - the inbound side: frames in, store updates out
//! - [`gateway`] - the outbound side: user actions in, gated publishes out
//!
//! The engine and gateway share the store but never call each other; their
//! only coupling is the state they both read and write.

pub mod engine;
pub mod gateway;
pub mod store;

pub use engine::SessionEngine;
pub use gateway::ActionGateway;
pub use store::{SessionSnapshot, SessionStore};
