// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Shared sync channel types: configuration, errors, session state

use serde::{Deserialize, Serialize};

/// Base transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseConfig {
    /// Bind address in `host:port` form
    pub address: String,
}

impl BaseConfig {
    pub fn validate(&self) -> SyncResult<()> {
        if self.address.is_empty() {
            return Err(SyncError::InvalidAddress("address is empty".to_string()));
        }
        if !self.address.contains(':') {
            return Err(SyncError::InvalidAddress(format!(
                "'{}' is not in host:port form",
                self.address
            )));
        }
        Ok(())
    }
}

/// Sync channel server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub base: BaseConfig,
}

impl ServerConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            base: BaseConfig {
                address: address.into(),
            },
        }
    }
}

/// Sync channel error types
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Sync channel already running")]
    AlreadyRunning,

    #[error("Sync channel not running")]
    NotRunning,

    #[error("Failed to bind server socket: {0}")]
    BindFailed(String),

    #[error("Failed to send data: {0}")]
    SendFailed(String),

    #[error("Failed to receive data: {0}")]
    ReceiveFailed(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Message encoding failed: {0}")]
    Serialization(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

/// Result type for sync channel operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Connection lifecycle state of the UI session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(ServerConfig::new("127.0.0.1:9002").base.validate().is_ok());
        assert!(ServerConfig::new("").base.validate().is_err());
        assert!(ServerConfig::new("localhost").base.validate().is_err());
    }
}
