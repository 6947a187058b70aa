// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! WebSocket sync channel (server side)
//!
//! Owns the connection to the UI peer and runs the periodic synchronization
//! cycle: drain parameter changes, flush signal buffers, send one JSON frame
//! when there is anything to send. Inbound frames carry parameter update
//! batches which are applied field by field.
//!
//! Single-client policy: one active session per controller. Additional
//! connections are refused after the handshake. While no session is active,
//! cycles are suppressed; device-side mutation continues and accumulates.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use benchlink_state::{ParameterStore, SignalBuffer};

use crate::common::{ServerConfig, SessionState, SyncError, SyncResult};
use crate::protocol::{apply_set, DataMessage, SetMessage};

/// WebSocket sync channel implementation
pub struct SyncChannel {
    config: ServerConfig,
    interval: Duration,
    parameters: Arc<ParameterStore>,
    signals: Arc<SignalBuffer>,
    running: Arc<RwLock<bool>>,
    state: Arc<RwLock<SessionState>>,
    server_handle: Arc<RwLock<Option<JoinHandle<()>>>>,
    session_handle: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl SyncChannel {
    /// Create a new sync channel over the given stores
    pub fn new(
        config: ServerConfig,
        interval: Duration,
        parameters: Arc<ParameterStore>,
        signals: Arc<SignalBuffer>,
    ) -> SyncResult<Self> {
        config.base.validate()?;

        Ok(Self {
            config,
            interval,
            parameters,
            signals,
            running: Arc::new(RwLock::new(false)),
            state: Arc::new(RwLock::new(SessionState::Disconnected)),
            server_handle: Arc::new(RwLock::new(None)),
            session_handle: Arc::new(RwLock::new(None)),
        })
    }

    /// Start the WebSocket server
    pub async fn start_async(&mut self) -> SyncResult<()> {
        if *self.running.read() {
            return Err(SyncError::AlreadyRunning);
        }

        let addr = self.config.base.address.clone();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| SyncError::BindFailed(e.to_string()))?;

        info!("🦀 [SYNC] Listening on {}", addr);

        *self.running.write() = true;

        let running = self.running.clone();
        let state = self.state.clone();
        let session_handle = self.session_handle.clone();
        let parameters = self.parameters.clone();
        let signals = self.signals.clone();
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            while *running.read() {
                match listener.accept().await {
                    Ok((stream, peer_addr)) => {
                        if *state.read() != SessionState::Disconnected {
                            // Single-client assumption: refuse the extra peer
                            warn!(
                                "[SYNC] Refusing connection from {}: session already active",
                                peer_addr
                            );
                            tokio::spawn(refuse_client(stream, peer_addr));
                            continue;
                        }

                        debug!("[SYNC] New connection from {}", peer_addr);
                        *state.write() = SessionState::Connecting;

                        let parameters = parameters.clone();
                        let signals = signals.clone();
                        let running = running.clone();
                        let state_session = state.clone();

                        let handle = tokio::spawn(async move {
                            if let Err(e) = handle_session(
                                stream,
                                peer_addr,
                                parameters,
                                signals,
                                interval,
                                running,
                                state_session.clone(),
                            )
                            .await
                            {
                                warn!("[SYNC] Client {} session error: {}", peer_addr, e);
                            }
                            *state_session.write() = SessionState::Disconnected;
                        });
                        *session_handle.write() = Some(handle);
                    }
                    Err(e) => {
                        error!("[SYNC] Accept error: {}", e);
                    }
                }
            }
        });

        *self.server_handle.write() = Some(handle);

        Ok(())
    }

    /// Stop the channel: no further cycles, connection released
    ///
    /// In-flight sends may be abandoned. Idempotent.
    pub fn stop(&mut self) -> SyncResult<()> {
        *self.running.write() = false;

        if let Some(handle) = self.server_handle.write().take() {
            handle.abort();
        }
        if let Some(handle) = self.session_handle.write().take() {
            handle.abort();
        }
        *self.state.write() = SessionState::Disconnected;

        Ok(())
    }

    pub fn is_running(&self) -> bool {
        *self.running.read()
    }

    /// Current session lifecycle state
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Bind address this channel was configured with
    pub fn address(&self) -> &str {
        &self.config.base.address
    }
}

/// Close a refused connection after completing the handshake, so the peer
/// sees an orderly close rather than a reset
async fn refuse_client(stream: TcpStream, peer_addr: SocketAddr) {
    match accept_async(stream).await {
        Ok(mut ws_stream) => {
            let _ = ws_stream.close(None).await;
        }
        Err(e) => {
            debug!("[SYNC] Refused client {} handshake failed: {}", peer_addr, e);
        }
    }
}

/// Handle one UI session: outbound cycle task + inbound apply loop
async fn handle_session(
    stream: TcpStream,
    peer_addr: SocketAddr,
    parameters: Arc<ParameterStore>,
    signals: Arc<SignalBuffer>,
    interval: Duration,
    running: Arc<RwLock<bool>>,
    state: Arc<RwLock<SessionState>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let ws_stream = accept_async(stream).await?;
    *state.write() = SessionState::Connected;

    info!("[SYNC] Client {} connected", peer_addr);

    let (mut write, mut read) = ws_stream.split();

    // Single writer task; the cycle task and the inbound reject path both
    // feed it
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

    let writer_task = tokio::spawn(async move {
        while let Some(text) = out_rx.recv().await {
            let len = text.len();
            if let Err(e) = write.send(Message::Text(text)).await {
                warn!(
                    "[SYNC] Client {} send error (disconnecting): {} (message_size={} bytes)",
                    peer_addr, e, len
                );
                break;
            }
        }
    });

    // Outbound cycle: drain + flush at the configured interval, send only
    // non-empty batches
    let cycle_task = {
        let parameters = parameters.clone();
        let out_tx = out_tx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            while *running.read() {
                ticker.tick().await;

                let message =
                    DataMessage::from_cycle(parameters.drain_changes(), signals.flush_all());
                if message.is_empty() {
                    continue;
                }

                match message.encode() {
                    Ok(text) => {
                        record_publish_stats(text.len() as u64);
                        if out_tx.send(text).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("[SYNC] Failed to encode cycle message: {}", e);
                    }
                }
            }
        })
    };

    // Inbound loop: parameter update batches from the peer
    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                handle_inbound(&text, &parameters, &out_tx, peer_addr);
            }
            Ok(Message::Binary(data)) => match String::from_utf8(data) {
                Ok(text) => handle_inbound(&text, &parameters, &out_tx, peer_addr),
                Err(_) => {
                    warn!("[SYNC] Client {} sent non-UTF8 binary frame", peer_addr);
                }
            },
            Ok(Message::Close(_)) => {
                debug!("[SYNC] Client {} sent close frame", peer_addr);
                break;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                // Handled by tungstenite
            }
            Ok(_) => {
                debug!("[SYNC] Client {} sent unexpected message type", peer_addr);
            }
            Err(e) => {
                warn!("[SYNC] Message error from {}: {}", peer_addr, e);
                break;
            }
        }
    }

    cycle_task.abort();
    writer_task.abort();

    info!("[SYNC] Client {} disconnected", peer_addr);

    Ok(())
}

/// Parse and apply one inbound frame; reply with rejections if any
fn handle_inbound(
    text: &str,
    parameters: &ParameterStore,
    out_tx: &mpsc::UnboundedSender<String>,
    peer_addr: SocketAddr,
) {
    let message = match SetMessage::decode(text) {
        Ok(message) => message,
        Err(e) => {
            warn!("[SYNC] Unparseable frame from {}: {}", peer_addr, e);
            return;
        }
    };

    let report = apply_set(parameters, &message);
    if report.applied > 0 {
        debug!(
            "[SYNC] Applied {} parameter update(s) from {}",
            report.applied, peer_addr
        );
    }

    if let Some(reply) = report.reject_reply() {
        match reply.encode() {
            Ok(text) => {
                let _ = out_tx.send(text);
            }
            Err(e) => {
                error!("[SYNC] Failed to encode reject reply: {}", e);
            }
        }
    }
}

/// Record outbound publish stats in a low-overhead, rate-limited way.
///
/// This is logging-only instrumentation to detect whether the cycle is
/// producing messages faster than the UI can consume them.
fn record_publish_stats(bytes: u64) {
    static PUBLISHED_TOTAL: AtomicU64 = AtomicU64::new(0);
    static BYTES_TOTAL: AtomicU64 = AtomicU64::new(0);
    static LAST_LOG_MS: AtomicU64 = AtomicU64::new(0);
    static LAST_PUBLISHED_TOTAL: AtomicU64 = AtomicU64::new(0);
    static LAST_BYTES_TOTAL: AtomicU64 = AtomicU64::new(0);

    let published_now = PUBLISHED_TOTAL.fetch_add(1, Ordering::Relaxed) + 1;
    let bytes_now = BYTES_TOTAL.fetch_add(bytes, Ordering::Relaxed) + bytes;

    let now_ms = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;

    let last_ms = LAST_LOG_MS.load(Ordering::Relaxed);
    // Log every 10 seconds max
    if now_ms.saturating_sub(last_ms) < 10_000 {
        return;
    }

    if LAST_LOG_MS
        .compare_exchange(last_ms, now_ms, Ordering::Relaxed, Ordering::Relaxed)
        .is_err()
    {
        return;
    }

    let prev_published = LAST_PUBLISHED_TOTAL.swap(published_now, Ordering::Relaxed);
    let prev_bytes = LAST_BYTES_TOTAL.swap(bytes_now, Ordering::Relaxed);

    let delta_published = published_now.saturating_sub(prev_published);
    let delta_bytes = bytes_now.saturating_sub(prev_bytes);
    let delta_ms = now_ms.saturating_sub(last_ms).max(1);

    let hz = (delta_published as f64) * 1000.0 / (delta_ms as f64);

    info!(
        "[SYNC] publish_rate_hz={:.2} bytes_per_ms={:.2} totals: messages={} bytes={}",
        hz,
        (delta_bytes as f64) / (delta_ms as f64),
        published_now,
        bytes_now
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_channel(address: &str) -> SyncChannel {
        SyncChannel::new(
            ServerConfig::new(address),
            Duration::from_millis(10),
            Arc::new(ParameterStore::new()),
            Arc::new(SignalBuffer::new(64)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_channel_creation() {
        let channel = test_channel("127.0.0.1:30040");
        assert!(!channel.is_running());
        assert_eq!(channel.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_channel_rejects_invalid_address() {
        let result = SyncChannel::new(
            ServerConfig::new("no-port"),
            Duration::from_millis(10),
            Arc::new(ParameterStore::new()),
            Arc::new(SignalBuffer::new(64)),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_channel_start_stop() {
        let mut channel = test_channel("127.0.0.1:30041");
        assert!(!channel.is_running());

        channel.start_async().await.unwrap();
        assert!(channel.is_running());

        // Double start is an error
        assert!(matches!(
            channel.start_async().await,
            Err(SyncError::AlreadyRunning)
        ));

        channel.stop().unwrap();
        assert!(!channel.is_running());
        assert_eq!(channel.state(), SessionState::Disconnected);

        // Stop is idempotent
        channel.stop().unwrap();
    }
}
