// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # benchlink Sync Channel
//!
//! Bidirectional WebSocket channel between a benchlink controller and its
//! browser UI peer.
//!
//! Outbound, per cycle: coalesced parameter changes and flushed signal
//! samples, as one JSON text frame; empty cycles send nothing. Inbound:
//! parameter update batches, applied field by field - a bad field is
//! skipped, reported back, and never aborts the batch.
//!
//! Reconnection is the host's concern; this crate accepts one session at a
//! time and suppresses cycles while disconnected.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod common;
pub mod protocol;
pub mod server;

// Re-export commonly used types
pub use common::{BaseConfig, ServerConfig, SessionState, SyncError, SyncResult};
pub use protocol::{apply_set, ApplyReport, DataMessage, RejectMessage, SetMessage};
pub use server::SyncChannel;
