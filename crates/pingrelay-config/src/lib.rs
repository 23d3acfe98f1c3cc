// SPDX-FileCopyrightText: 2026 PingRelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for PingRelay.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, and environment
//! variable overrides.
//!
//! # Usage
//!
//! ```no_run
//! let config = pingrelay_config::load_and_validate().expect("config errors");
//! println!("service: {}", config.service.name);
//! ```

pub mod loader;
pub mod model;
pub mod validation;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::PingRelayConfig;

use pingrelay_core::PingRelayError;

/// Load configuration from the XDG hierarchy and validate it.
///
/// The high-level entry point used by the binary: loads config from TOML
/// files plus env vars via Figment, then runs post-deserialization
/// validation.
pub fn load_and_validate() -> Result<PingRelayConfig, PingRelayError> {
    let config = loader::load_config().map_err(|e| PingRelayError::Config(e.to_string()))?;
    validation::validate_config(&config)?;
    Ok(config)
}

/// Load configuration from a TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<PingRelayConfig, PingRelayError> {
    let config = loader::load_config_from_str(toml_content)
        .map_err(|e| PingRelayError::Config(e.to_string()))?;
    validation::validate_config(&config)?;
    Ok(config)
}
