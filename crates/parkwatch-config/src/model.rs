// SPDX-FileCopyrightText: 2026 Parkwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Parkwatch client.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Parkwatch configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParkwatchConfig {
    /// Application identity and logging settings.
    #[serde(default)]
    pub app: AppConfig,

    /// MQTT broker connection settings.
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Topic namespace settings.
    #[serde(default)]
    pub topics: TopicsConfig,

    /// Target parking controller settings.
    #[serde(default)]
    pub controller: ControllerConfig,

    /// Conversation flow tuning.
    #[serde(default)]
    pub flows: FlowsConfig,
}

/// Application identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Display name of the client.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_app_name() -> String {
    "parkwatch".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// MQTT broker connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BrokerConfig {
    /// Broker hostname or IP address.
    #[serde(default = "default_broker_host")]
    pub host: String,

    /// Broker TCP port.
    #[serde(default = "default_broker_port")]
    pub port: u16,

    /// Prefix for the per-attempt random client identifier.
    #[serde(default = "default_client_id_prefix")]
    pub client_id_prefix: String,

    /// MQTT keep-alive interval in seconds.
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,

    /// Fixed backoff between reconnect attempts in seconds.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,

    /// Event-loop request queue capacity.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_broker_host(),
            port: default_broker_port(),
            client_id_prefix: default_client_id_prefix(),
            keepalive_secs: default_keepalive_secs(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            capacity: default_capacity(),
        }
    }
}

fn default_broker_host() -> String {
    "broker.emqx.io".to_string()
}

fn default_broker_port() -> u16 {
    1883
}

fn default_client_id_prefix() -> String {
    "parkwatch_".to_string()
}

fn default_keepalive_secs() -> u64 {
    60
}

fn default_reconnect_delay_secs() -> u64 {
    1
}

fn default_capacity() -> usize {
    64
}

/// Topic namespace configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TopicsConfig {
    /// Namespace root prefixed to every subscribed and published topic.
    #[serde(default = "default_topic_root")]
    pub root: String,
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            root: default_topic_root(),
        }
    }
}

fn default_topic_root() -> String {
    "sparking-esp32".to_string()
}

/// Target parking controller configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ControllerConfig {
    /// Controller device id echoed in two-factor responses.
    #[serde(default = "default_device_id")]
    pub device_id: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            device_id: default_device_id(),
        }
    }
}

fn default_device_id() -> String {
    "ESP32_Parking_01".to_string()
}

/// Conversation flow tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FlowsConfig {
    /// Soft wait window in seconds after Initiating before the display
    /// message switches to a still-waiting text. Cosmetic only; the device
    /// owns the authoritative timeout.
    #[serde(default = "default_ready_wait_secs")]
    pub ready_wait_secs: u64,
}

impl Default for FlowsConfig {
    fn default() -> Self {
        Self {
            ready_wait_secs: default_ready_wait_secs(),
        }
    }
}

fn default_ready_wait_secs() -> u64 {
    5
}
