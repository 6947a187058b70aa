// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Controller lifecycle facade
//!
//! The host web server hot-loads a controller into the running application
//! process and unloads it on navigation away. That lifecycle is explicit
//! here: build with [`Controller::new`], bind and start syncing with
//! [`Controller::start`], release everything with
//! [`Controller::shutdown`]. No runtime dynamic-loading semantics are
//! assumed.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use benchlink_config::{validate_config, BenchlinkConfig, ConfigError};
use benchlink_state::{ParameterStore, SignalBuffer};
use benchlink_sync::{ServerConfig, SessionState, SyncChannel, SyncError};

/// Controller error types
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sync channel error: {0}")]
    Sync(#[from] SyncError),
}

/// The backend controller: owner of the parameter store, the signal buffer,
/// and the sync channel to the UI peer
///
/// Stores are shared behind `Arc`; hand clones to device-facing code via
/// [`parameters`](Self::parameters) and [`signals`](Self::signals). No
/// hidden globals.
pub struct Controller {
    app_id: String,
    parameters: Arc<ParameterStore>,
    signals: Arc<SignalBuffer>,
    channel: SyncChannel,
    started: bool,
}

impl Controller {
    /// Build a controller from validated configuration
    pub fn new(config: BenchlinkConfig) -> Result<Self, ControllerError> {
        validate_config(&config)?;

        let parameters = Arc::new(ParameterStore::new());
        let signals = Arc::new(SignalBuffer::new(config.signals.default_capacity));

        let channel = SyncChannel::new(
            ServerConfig::new(config.server.address()),
            Duration::from_millis(config.sync.interval_ms),
            parameters.clone(),
            signals.clone(),
        )?;

        Ok(Self {
            app_id: config.system.app_id,
            parameters,
            signals,
            channel,
            started: false,
        })
    }

    /// Bind the sync server and begin accepting the UI session
    pub async fn start(&mut self) -> Result<(), ControllerError> {
        self.channel.start_async().await?;
        self.started = true;
        info!(
            "Controller '{}' started on {}",
            self.app_id,
            self.channel.address()
        );
        Ok(())
    }

    /// Stop syncing and release the connection
    ///
    /// Idempotent; safe to call on a controller that never started.
    /// In-flight sends may be abandoned. Parameter and signal state
    /// survives until the controller is dropped.
    pub fn shutdown(&mut self) {
        if !self.started {
            return;
        }
        let _ = self.channel.stop();
        self.started = false;
        info!("Controller '{}' shut down", self.app_id);
    }

    /// Parameter store handle for device-facing code
    pub fn parameters(&self) -> Arc<ParameterStore> {
        self.parameters.clone()
    }

    /// Signal buffer handle for device-facing code
    pub fn signals(&self) -> Arc<SignalBuffer> {
        self.signals.clone()
    }

    /// Application identifier from configuration
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Lifecycle state of the UI session
    pub fn session_state(&self) -> SessionState {
        self.channel.state()
    }

    pub fn is_running(&self) -> bool {
        self.channel.is_running()
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.shutdown();
    }
}
