// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `benchlink_configuration.toml`.

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BenchlinkConfig {
    pub system: SystemConfig,
    pub server: ServerConfig,
    pub sync: SyncConfig,
    pub signals: SignalsConfig,
    pub logging: LoggingConfig,
}

/// System-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Application identifier reported to the host web server
    pub app_id: String,
    pub log_level: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            app_id: "benchlink".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Sync channel server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9002,
        }
    }
}

impl ServerConfig {
    /// Bind address in `host:port` form
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Synchronization cycle configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Outbound cycle period in milliseconds
    pub interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        // 20 Hz matches the browser UI refresh cadence
        Self { interval_ms: 50 }
    }
}

/// Signal buffer configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SignalsConfig {
    /// Ring capacity (samples) used when a signal is registered without an
    /// explicit capacity
    pub default_capacity: usize,
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            default_capacity: 16384,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Write JSON log files in addition to console output
    pub file_logging: bool,
    pub log_dir: String,
    /// Keep logs for N days
    pub retention_days: u64,
    /// Keep N most recent runs
    pub retention_runs: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file_logging: false,
            log_dir: "./logs".to_string(),
            retention_days: 30,
            retention_runs: 10,
        }
    }
}
