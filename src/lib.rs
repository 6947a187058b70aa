// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # benchlink - Controller runtime for measurement instrument applications
//!
//! benchlink is the backend half of a browser-served instrument application:
//! a controller that owns named typed parameters and acquired signal
//! streams, and keeps a browser UI in sync over a WebSocket JSON channel.
//! The host web server loads one controller per application instance and
//! drives its lifecycle; device-facing acquisition code mutates the stores
//! from its own thread.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use benchlink::prelude::*;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BenchlinkConfig::default();
//! let mut controller = Controller::new(config)?;
//!
//! // Register application state before starting
//! let params = controller.parameters();
//! params.register(
//!     "gain",
//!     ParameterValue::Float(0.5),
//!     Constraint::Range { min: 0.0, max: 1.0 },
//! )?;
//! let signals = controller.signals();
//! signals.register("osc_ch1")?;
//!
//! // React to UI edits from the device side
//! params.on_change(Box::new(|name, value| {
//!     println!("UI wrote {} = {:?}", name, value);
//! }));
//!
//! controller.start().await?;
//!
//! // ... device loop appends samples, sets parameters ...
//! signals.append("osc_ch1", &[0.01, 0.02])?;
//!
//! controller.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! ## Crates
//!
//! - [`config`]: TOML configuration with env/CLI overrides
//! - [`observability`]: logging initialization
//! - [`state`]: parameter store and signal buffer
//! - [`sync`]: WebSocket sync channel and wire protocol

pub use benchlink_config as config;
pub use benchlink_observability as observability;
pub use benchlink_state as state;
pub use benchlink_sync as sync;

mod controller;

pub use controller::{Controller, ControllerError};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::controller::{Controller, ControllerError};
    pub use benchlink_config::{load_config, BenchlinkConfig};
    pub use benchlink_state::{
        Constraint, ParameterKind, ParameterStore, ParameterValue, SignalBuffer,
    };
    pub use benchlink_sync::{DataMessage, SessionState, SetMessage, SyncChannel};
}
