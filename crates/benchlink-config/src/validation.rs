// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! This module provides validation logic to ensure configuration values are
//! consistent and within valid ranges.

use crate::{BenchlinkConfig, ConfigError, ConfigResult};

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    InvalidPortRange { port_name: String, port: u16 },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPortRange { port_name, port } => {
                write!(
                    f,
                    "Port {} = {} is outside valid range (1024-65535)",
                    port_name, port
                )
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - Port range (1024-65535 for non-root ports)
/// - Non-zero sync interval
/// - Non-zero signal capacity
/// - Non-empty app id
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` with details if validation fails
pub fn validate_config(config: &BenchlinkConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    if config.server.port < 1024 {
        errors.push(ConfigValidationError::InvalidPortRange {
            port_name: "server.port".to_string(),
            port: config.server.port,
        });
    }

    if config.sync.interval_ms == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "sync.interval_ms".to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }

    if config.signals.default_capacity == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "signals.default_capacity".to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }

    if config.system.app_id.is_empty() {
        errors.push(ConfigValidationError::InvalidValue {
            field: "system.app_id".to_string(),
            reason: "must not be empty".to_string(),
        });
    }

    if config.logging.file_logging && config.logging.log_dir.is_empty() {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.log_dir".to_string(),
            reason: "must not be empty when file_logging is enabled".to_string(),
        });
    }

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = BenchlinkConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = BenchlinkConfig::default();
        config.sync.interval_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_privileged_port_rejected() {
        let mut config = BenchlinkConfig::default();
        config.server.port = 80;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("server.port"));
    }

    #[test]
    fn test_multiple_errors_reported_together() {
        let mut config = BenchlinkConfig::default();
        config.sync.interval_ms = 0;
        config.signals.default_capacity = 0;
        let err = validate_config(&config).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("sync.interval_ms"));
        assert!(msg.contains("signals.default_capacity"));
    }
}
