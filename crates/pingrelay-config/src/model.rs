// SPDX-FileCopyrightText: 2026 PingRelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level PingRelay configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PingRelayConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// WAHA (WhatsApp HTTP API) gateway settings.
    #[serde(default)]
    pub waha: WahaConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Dispatch scheduler settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// HTTP trigger server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "pingrelay".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// WAHA gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WahaConfig {
    /// Base URL of the WAHA instance.
    #[serde(default = "default_waha_base_url")]
    pub base_url: String,

    /// API key sent as `X-Api-Key` on every request. `None` disables the header.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request HTTP timeout so a hung gateway cannot stall a tick.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl Default for WahaConfig {
    fn default() -> Self {
        Self {
            base_url: default_waha_base_url(),
            api_key: None,
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

fn default_waha_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_http_timeout_secs() -> u64 {
    10
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("pingrelay").join("pingrelay.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "pingrelay.db".to_string())
}

/// Dispatch scheduler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Bearer secret required on the cron trigger endpoints.
    /// `None` rejects all trigger requests (fail-closed).
    #[serde(default)]
    pub cron_secret: Option<String>,

    /// Send every message regardless of its due instant (dev tool).
    #[serde(default)]
    pub force_send: bool,

    /// Lower bound of the randomized inter-message delay, in seconds.
    #[serde(default = "default_message_delay_min_secs")]
    pub message_delay_min_secs: u64,

    /// Upper bound of the randomized inter-message delay, in seconds.
    #[serde(default = "default_message_delay_max_secs")]
    pub message_delay_max_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cron_secret: None,
            force_send: false,
            message_delay_min_secs: default_message_delay_min_secs(),
            message_delay_max_secs: default_message_delay_max_secs(),
        }
    }
}

fn default_message_delay_min_secs() -> u64 {
    5
}

fn default_message_delay_max_secs() -> u64 {
    20
}

/// HTTP trigger server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_server_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_server_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8088
}
