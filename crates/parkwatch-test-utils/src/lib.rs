// SPDX-FileCopyrightText: 2026 Parkwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Parkwatch integration tests.
//!
//! Provides mock collaborators for fast, deterministic, CI-runnable tests
//! without a real broker or confirmation hardware.
//!
//! # Components
//!
//! - [`MockTransport`] - In-memory transport with frame injection and publish capture
//! - [`MockGate`] - Scripted confirmation gate
//! - [`RecordingAlerts`] / [`RecordingNotifier`] - Capture-only presentation sinks
//! - [`TestHarness`] - Full session stack wired over the mocks

pub mod harness;
pub mod mock_gate;
pub mod mock_transport;
pub mod recorders;

pub use harness::TestHarness;
pub use mock_gate::MockGate;
pub use mock_transport::MockTransport;
pub use recorders::{RecordingAlerts, RecordingNotifier};
