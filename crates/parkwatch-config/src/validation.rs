// SPDX-FileCopyrightText: 2026 Parkwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty hosts and sane timing values.

use crate::model::ParkwatchConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<String>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ParkwatchConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    let host = config.broker.host.trim();
    if host.is_empty() {
        errors.push("broker.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(format!(
                "broker.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if config.broker.port == 0 {
        errors.push("broker.port must be non-zero".to_string());
    }

    if config.broker.keepalive_secs == 0 {
        errors.push("broker.keepalive_secs must be non-zero".to_string());
    }

    if config.broker.client_id_prefix.trim().is_empty() {
        errors.push("broker.client_id_prefix must not be empty".to_string());
    }

    // Wildcards belong in subscription filters, never in the root prefix.
    let root = config.topics.root.trim();
    if root.contains('#') || root.contains('+') {
        errors.push(format!(
            "topics.root `{root}` must not contain MQTT wildcards"
        ));
    }

    if config.controller.device_id.trim().is_empty() {
        errors.push("controller.device_id must not be empty".to_string());
    }

    let levels = ["trace", "debug", "info", "warn", "error"];
    if !levels.contains(&config.app.log_level.as_str()) {
        errors.push(format!(
            "app.log_level `{}` is not one of trace, debug, info, warn, error",
            config.app.log_level
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ParkwatchConfig::default()).is_ok());
    }

    #[test]
    fn empty_host_is_rejected() {
        let mut config = ParkwatchConfig::default();
        config.broker.host = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("broker.host")));
    }

    #[test]
    fn wildcard_root_is_rejected() {
        let mut config = ParkwatchConfig::default();
        config.topics.root = "park/#".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("wildcards")));
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = ParkwatchConfig::default();
        config.broker.host = String::new();
        config.broker.port = 0;
        config.controller.device_id = String::new();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 3);
    }

    #[test]
    fn bad_log_level_is_rejected() {
        let mut config = ParkwatchConfig::default();
        config.app.log_level = "loud".to_string();
        assert!(validate_config(&config).is_err());
    }
}
