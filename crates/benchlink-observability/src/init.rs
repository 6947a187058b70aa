// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Unified logging initialization for benchlink
//!
//! Provides console logging plus optional file logging with rotation and
//! configurable retention.

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;

#[cfg(feature = "file-logging")]
use std::path::{Path, PathBuf};

/// Logging initialization result
///
/// Keep this alive for the lifetime of the process; file layers flush on drop.
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
    #[cfg(feature = "file-logging")]
    log_dir: Option<PathBuf>,
}

#[cfg(feature = "file-logging")]
impl LoggingGuard {
    /// Get the log directory path, if file logging is active
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Initialize console logging
///
/// The filter is built from `base_level` (typically `system.log_level` from
/// configuration) plus any per-crate debug flags.
pub fn init_logging(debug_flags: &CrateDebugFlags, base_level: &str) -> Result<LoggingGuard> {
    let filter = debug_flags.to_filter_string(base_level);
    let env_filter = EnvFilter::new(&filter);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_filter(env_filter);

    Registry::default().with(console_layer.boxed()).init();

    Ok(LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guards: Vec::new(),
        #[cfg(feature = "file-logging")]
        log_dir: None,
    })
}

/// Initialize logging with file output and console output
///
/// Creates a timestamped folder structure:
/// ```text
/// ./logs/
///   └── run_20250101_120000/
///       └── benchlink.log
/// ```
///
/// # Arguments
/// * `debug_flags` - Per-crate debug flags for filtering
/// * `base_level` - Default level for crates without a debug flag
/// * `log_dir` - Base directory for logs
/// * `retention_days` - Keep logs for N days
/// * `retention_runs` - Keep N most recent runs
#[cfg(feature = "file-logging")]
pub fn init_logging_with_files(
    debug_flags: &CrateDebugFlags,
    base_level: &str,
    log_dir: PathBuf,
    retention_days: u64,
    retention_runs: usize,
) -> Result<LoggingGuard> {
    use anyhow::Context;
    use chrono::Utc;
    use tracing_appender::rolling;

    // Create timestamped run folder
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let run_folder = log_dir.join(format!("run_{}", timestamp));
    std::fs::create_dir_all(&run_folder)
        .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;

    cleanup_old_logs(&log_dir, retention_days, retention_runs)?;

    let filter = debug_flags.to_filter_string(base_level);
    let env_filter = EnvFilter::new(&filter);

    let mut layers = Vec::new();
    let mut file_guards = Vec::new();

    // Console layer (human-readable)
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_filter(EnvFilter::new(&filter));
    layers.push(console_layer.boxed());

    // Combined log file (JSON, all crates)
    let file_appender = rolling::daily(&run_folder, "benchlink.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    file_guards.push(guard);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .json()
        .with_filter(env_filter)
        .boxed();
    layers.push(file_layer);

    Registry::default().with(layers).init();

    Ok(LoggingGuard {
        _file_guards: file_guards,
        log_dir: Some(run_folder),
    })
}

/// Clean up old log directories based on retention policy
#[cfg(feature = "file-logging")]
fn cleanup_old_logs(base_log_dir: &Path, retention_days: u64, retention_runs: usize) -> Result<()> {
    use chrono::{DateTime, NaiveDateTime, Utc};

    if !base_log_dir.exists() {
        return Ok(());
    }

    let cutoff_date = Utc::now() - chrono::Duration::days(retention_days as i64);

    // Collect all run directories
    let mut runs: Vec<(PathBuf, DateTime<Utc>)> = Vec::new();

    for entry in std::fs::read_dir(base_log_dir)? {
        let entry = entry?;
        let path = entry.path();

        if !path.is_dir() {
            continue;
        }
        let Some(dir_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(timestamp_str) = dir_name.strip_prefix("run_") {
            // Parse timestamp from folder name: run_20250101_120000
            if let Ok(dt) = NaiveDateTime::parse_from_str(timestamp_str, "%Y%m%d_%H%M%S") {
                runs.push((path, dt.and_utc()));
            }
        }
    }

    // Sort by date (oldest first)
    runs.sort_by_key(|(_, dt)| *dt);

    // Remove runs older than retention_days
    runs.retain(|(path, dt)| {
        if *dt < cutoff_date {
            if let Err(e) = std::fs::remove_dir_all(path) {
                eprintln!(
                    "Warning: Failed to remove old log directory {}: {}",
                    path.display(),
                    e
                );
            }
            false
        } else {
            true
        }
    });

    // Keep only the most recent N runs
    if runs.len() > retention_runs {
        let to_remove = runs.len() - retention_runs;
        for (path, _) in runs.iter().take(to_remove) {
            if let Err(e) = std::fs::remove_dir_all(path) {
                eprintln!(
                    "Warning: Failed to remove old log directory {}: {}",
                    path.display(),
                    e
                );
            }
        }
    }

    Ok(())
}

#[cfg(all(test, feature = "file-logging"))]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_keeps_recent_runs() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["run_20200101_000000", "run_20990101_000000", "not_a_run"] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }

        cleanup_old_logs(dir.path(), 30, 10).unwrap();

        // Ancient run removed, future-dated run kept, unrelated dir untouched
        assert!(!dir.path().join("run_20200101_000000").exists());
        assert!(dir.path().join("run_20990101_000000").exists());
        assert!(dir.path().join("not_a_run").exists());
    }
}
