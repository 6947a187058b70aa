// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # benchlink-observability
//!
//! Unified observability infrastructure for benchlink controllers.
//!
//! Provides consistent logging initialization across all benchlink crates
//! with per-crate debug flag support.
//!
//! ## Features
//! - `file-logging`: File-based log rotation (desktop only)

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

// Re-export commonly used items
pub use cli::*;
pub use init::*;

/// Known benchlink crate names for debug flags (tracing target form)
pub const KNOWN_CRATES: &[&str] = &[
    "benchlink",
    "benchlink_config",
    "benchlink_state",
    "benchlink_sync",
    "benchlink_observability",
];
