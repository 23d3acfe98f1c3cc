// SPDX-FileCopyrightText: 2026 PingRelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the PingRelay workspace.

use thiserror::Error;

/// The primary error type used across all PingRelay crates.
#[derive(Debug, Error)]
pub enum PingRelayError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// WAHA gateway errors (HTTP failure, unexpected payload, session state).
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PingRelayError {
    /// Shorthand for a gateway error wrapping an underlying cause.
    pub fn gateway(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Gateway {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Shorthand for a gateway error with no underlying cause.
    pub fn gateway_msg(message: impl Into<String>) -> Self {
        Self::Gateway {
            message: message.into(),
            source: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_error_carries_source() {
        let err = PingRelayError::gateway("send failed", std::io::Error::other("boom"));
        assert!(err.to_string().contains("send failed"));
        match err {
            PingRelayError::Gateway { source, .. } => assert!(source.is_some()),
            _ => panic!("expected Gateway variant"),
        }
    }

    #[test]
    fn storage_error_displays_source() {
        let err = PingRelayError::Storage {
            source: Box::new(std::io::Error::other("disk full")),
        };
        assert!(err.to_string().contains("disk full"));
    }
}
