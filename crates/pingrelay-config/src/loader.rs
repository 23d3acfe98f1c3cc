// SPDX-FileCopyrightText: 2026 PingRelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports the XDG hierarchy: `./pingrelay.toml` >
//! `~/.config/pingrelay/pingrelay.toml` > `/etc/pingrelay/pingrelay.toml`,
//! with environment variable overrides via the `PINGRELAY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::PingRelayConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/pingrelay/pingrelay.toml` (system-wide)
/// 3. `~/.config/pingrelay/pingrelay.toml` (user XDG config)
/// 4. `./pingrelay.toml` (local directory)
/// 5. `PINGRELAY_*` environment variables
pub fn load_config() -> Result<PingRelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PingRelayConfig::default()))
        .merge(Toml::file("/etc/pingrelay/pingrelay.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("pingrelay/pingrelay.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("pingrelay.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<PingRelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PingRelayConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<PingRelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PingRelayConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `PINGRELAY_SCHEDULER_CRON_SECRET` must
/// map to `scheduler.cron_secret`, not `scheduler.cron.secret`.
///
/// Figment hands the key through in its original (uppercase) form, so it
/// is lowercased before the section prefixes are rewritten.
fn env_provider() -> Env {
    Env::prefixed("PINGRELAY_").map(|key| {
        let lowered = key.as_str().to_lowercase();
        let mapped = lowered
            .replacen("service_", "service.", 1)
            .replacen("waha_", "waha.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("scheduler_", "scheduler.", 1)
            .replacen("server_", "server.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.service.name, "pingrelay");
        assert_eq!(config.service.log_level, "info");
        assert_eq!(config.waha.base_url, "http://localhost:3000");
        assert_eq!(config.waha.http_timeout_secs, 10);
        assert!(config.scheduler.cron_secret.is_none());
        assert!(!config.scheduler.force_send);
        assert_eq!(config.scheduler.message_delay_min_secs, 5);
        assert_eq!(config.scheduler.message_delay_max_secs, 20);
        assert_eq!(config.server.port, 8088);
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = load_config_from_str(
            r#"
[waha]
base_url = "http://waha.internal:3000"
api_key = "secret-key"

[scheduler]
cron_secret = "cron-secret"
message_delay_min_secs = 0
message_delay_max_secs = 0

[server]
host = "0.0.0.0"
port = 9000
"#,
        )
        .unwrap();
        assert_eq!(config.waha.base_url, "http://waha.internal:3000");
        assert_eq!(config.waha.api_key.as_deref(), Some("secret-key"));
        assert_eq!(config.scheduler.cron_secret.as_deref(), Some("cron-secret"));
        assert_eq!(config.scheduler.message_delay_max_secs, 0);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = load_config_from_str(
            r#"
[waha]
base_ulr = "typo"
"#,
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(
            msg.contains("unknown field") || msg.contains("base_ulr"),
            "got: {msg}"
        );
    }

    #[test]
    fn env_vars_override_toml() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("PINGRELAY_SCHEDULER_CRON_SECRET", "from-env");
            jail.set_env("PINGRELAY_WAHA_BASE_URL", "http://env:3000");
            jail.set_env("PINGRELAY_SERVER_PORT", "9999");
            let config = load_config().expect("config should load");
            assert_eq!(config.scheduler.cron_secret.as_deref(), Some("from-env"));
            assert_eq!(config.waha.base_url, "http://env:3000");
            assert_eq!(config.server.port, 9999);
            Ok(())
        });
    }
}
