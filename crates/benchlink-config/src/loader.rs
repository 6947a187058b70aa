// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{BenchlinkConfig, ConfigError, ConfigResult};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Find the benchlink configuration file
///
/// Search order:
/// 1. `BENCHLINK_CONFIG_PATH` environment variable
/// 2. Current working directory: `./benchlink_configuration.toml`
/// 3. Parent directories (searches up to 5 levels)
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    // 1. Check environment variable first
    if let Ok(env_path) = env::var("BENCHLINK_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        } else {
            return Err(ConfigError::FileNotFound(format!(
                "Config file specified by BENCHLINK_CONFIG_PATH not found: {}",
                path.display()
            )));
        }
    }

    // 2. Search in common locations
    let mut search_paths = Vec::new();

    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join("benchlink_configuration.toml"));

        // Search up to 5 levels for workspace root
        let mut current = cwd.clone();
        for _ in 0..5 {
            if let Some(parent) = current.parent() {
                search_paths.push(parent.join("benchlink_configuration.toml"));
                current = parent.to_path_buf();
            }
        }
    }

    for path in &search_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "benchlink configuration file 'benchlink_configuration.toml' not found in any of these locations:\n{}\n\nSet BENCHLINK_CONFIG_PATH environment variable to specify custom location.",
        search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Returns
///
/// Complete `BenchlinkConfig` with all overrides applied
///
/// # Errors
///
/// Returns error if config file is not found or contains invalid TOML
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<BenchlinkConfig> {
    let config_file = if let Some(path) = config_path {
        path.to_path_buf()
    } else {
        find_config_file()?
    };

    let content = fs::read_to_string(&config_file)?;

    let mut config: BenchlinkConfig = toml::from_str(&content)?;

    // Apply overrides in order
    apply_environment_overrides(&mut config);

    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    info!(
        "Loaded configuration from {} (app_id={})",
        config_file.display(),
        config.system.app_id
    );

    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `BENCHLINK_SERVER_HOST` -> `server.host`
/// - `BENCHLINK_SERVER_PORT` -> `server.port`
/// - `BENCHLINK_SYNC_INTERVAL_MS` -> `sync.interval_ms`
/// - `BENCHLINK_SIGNAL_CAPACITY` -> `signals.default_capacity`
/// - `BENCHLINK_LOG_LEVEL` -> `system.log_level`
/// - `BENCHLINK_APP_ID` -> `system.app_id`
pub fn apply_environment_overrides(config: &mut BenchlinkConfig) {
    if let Ok(value) = env::var("BENCHLINK_SERVER_HOST") {
        config.server.host = value;
    }
    if let Ok(value) = env::var("BENCHLINK_SERVER_PORT") {
        if let Ok(port) = value.parse::<u16>() {
            config.server.port = port;
        }
    }
    if let Ok(value) = env::var("BENCHLINK_SYNC_INTERVAL_MS") {
        if let Ok(interval) = value.parse::<u64>() {
            config.sync.interval_ms = interval;
        }
    }
    if let Ok(value) = env::var("BENCHLINK_SIGNAL_CAPACITY") {
        if let Ok(capacity) = value.parse::<usize>() {
            config.signals.default_capacity = capacity;
        }
    }
    if let Ok(value) = env::var("BENCHLINK_LOG_LEVEL") {
        config.system.log_level = value;
    }
    if let Ok(value) = env::var("BENCHLINK_APP_ID") {
        config.system.app_id = value;
    }
}

/// Apply CLI argument overrides to configuration
///
/// Accepts dotted config paths as keys, e.g. `server.port` or
/// `sync.interval_ms`. Unknown keys are ignored.
pub fn apply_cli_overrides(config: &mut BenchlinkConfig, cli_args: &HashMap<String, String>) {
    for (key, value) in cli_args {
        match key.as_str() {
            "server.host" => config.server.host = value.clone(),
            "server.port" => {
                if let Ok(port) = value.parse::<u16>() {
                    config.server.port = port;
                }
            }
            "sync.interval_ms" => {
                if let Ok(interval) = value.parse::<u64>() {
                    config.sync.interval_ms = interval;
                }
            }
            "signals.default_capacity" => {
                if let Ok(capacity) = value.parse::<usize>() {
                    config.signals.default_capacity = capacity;
                }
            }
            "system.log_level" => config.system.log_level = value.clone(),
            "system.app_id" => config.system.app_id = value.clone(),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [system]
            app_id = "scope_app"

            [server]
            host = "127.0.0.1"
            port = 9300

            [sync]
            interval_ms = 25
            "#
        )
        .unwrap();

        let config = load_config(Some(file.path()), None).unwrap();
        assert_eq!(config.system.app_id, "scope_app");
        assert_eq!(config.server.port, 9300);
        assert_eq!(config.sync.interval_ms, 25);
        // Untouched section falls back to defaults
        assert_eq!(config.signals.default_capacity, 16384);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = BenchlinkConfig::default();
        let mut cli = HashMap::new();
        cli.insert("server.port".to_string(), "9400".to_string());
        cli.insert("sync.interval_ms".to_string(), "100".to_string());
        cli.insert("unknown.key".to_string(), "ignored".to_string());

        apply_cli_overrides(&mut config, &cli);
        assert_eq!(config.server.port, 9400);
        assert_eq!(config.sync.interval_ms, 100);
    }

    #[test]
    fn test_invalid_toml_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "this is not toml [[").unwrap();

        let result = load_config(Some(file.path()), None);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
