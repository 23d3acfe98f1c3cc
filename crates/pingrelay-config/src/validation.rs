// SPDX-FileCopyrightText: 2026 PingRelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes. Collects all problems instead of failing fast.

use pingrelay_core::PingRelayError;

use crate::model::PingRelayConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &PingRelayConfig) -> Result<(), PingRelayError> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.service.log_level.as_str()) {
        errors.push(format!(
            "service.log_level must be one of {LOG_LEVELS:?}, got `{}`",
            config.service.log_level
        ));
    }

    if config.waha.base_url.trim().is_empty() {
        errors.push("waha.base_url must not be empty".to_string());
    } else if !config.waha.base_url.starts_with("http://")
        && !config.waha.base_url.starts_with("https://")
    {
        errors.push(format!(
            "waha.base_url must be an http(s) URL, got `{}`",
            config.waha.base_url
        ));
    }

    if config.waha.http_timeout_secs == 0 {
        errors.push("waha.http_timeout_secs must be at least 1".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push("storage.database_path must not be empty".to_string());
    }

    if config.scheduler.message_delay_min_secs > config.scheduler.message_delay_max_secs {
        errors.push(format!(
            "scheduler.message_delay_min_secs ({}) must not exceed message_delay_max_secs ({})",
            config.scheduler.message_delay_min_secs, config.scheduler.message_delay_max_secs
        ));
    }

    if config.server.host.trim().is_empty() {
        errors.push("server.host must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(PingRelayError::Config(errors.join("; ")))
    }
}
