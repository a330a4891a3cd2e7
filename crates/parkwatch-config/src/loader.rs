// SPDX-FileCopyrightText: 2026 Parkwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./parkwatch.toml` > `~/.config/parkwatch/parkwatch.toml`
//! > `/etc/parkwatch/parkwatch.toml` with environment variable overrides via
//! `PARKWATCH_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::ParkwatchConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/parkwatch/parkwatch.toml` (system-wide)
/// 3. `~/.config/parkwatch/parkwatch.toml` (user XDG config)
/// 4. `./parkwatch.toml` (local directory)
/// 5. `PARKWATCH_*` environment variables
pub fn load_config() -> Result<ParkwatchConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ParkwatchConfig::default()))
        .merge(Toml::file("/etc/parkwatch/parkwatch.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("parkwatch/parkwatch.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("parkwatch.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<ParkwatchConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ParkwatchConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ParkwatchConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ParkwatchConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `PARKWATCH_BROKER_CLIENT_ID_PREFIX`
/// must map to `broker.client_id_prefix`, not `broker.client.id.prefix`.
fn env_provider() -> Env {
    Env::prefixed("PARKWATCH_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: PARKWATCH_BROKER_HOST -> "broker_host"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("app_", "app.", 1)
            .replacen("broker_", "broker.", 1)
            .replacen("topics_", "topics.", 1)
            .replacen("controller_", "controller.", 1)
            .replacen("flows_", "flows.", 1);
        mapped.into()
    })
}
