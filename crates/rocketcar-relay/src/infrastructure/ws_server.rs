//! WebSocket server: accept loop and per-connection tasks.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Starting the relay [`Hub`] task.
//! 3. Accepting incoming TCP connections from desktops and phones.
//! 4. Upgrading each connection to a WebSocket session and giving it a fresh
//!    [`ConnectionId`].
//! 5. Pumping frames between the socket and the hub until the peer leaves,
//!    goes silent for too long, or the hub stops.
//! 6. Stopping the accept loop when the `running` flag is cleared.
//!
//! # One task per connection
//!
//! Each connection runs a single `tokio::select!` loop over three sources:
//! inbound WebSocket frames, the connection's outbox, and the keepalive
//! ticker.  Because only that loop writes to the socket, the sink needs no
//! `Mutex`.
//!
//! # Keepalive
//!
//! The server sends a WebSocket ping every `ping_interval`.  Browsers answer
//! pings automatically, so a live peer always produces inbound traffic.  A
//! connection with no inbound frame of any kind for
//! `ping_interval + ping_timeout` is closed and reported to the hub as a
//! disconnect.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{interval_at, sleep, timeout, Instant, MissedTickBehavior};
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, error, info, warn};

use rocketcar_core::{decode_client_event, encode_server_event, ConnectionId, ServerEvent};

use crate::application::{ConnectionHandler, SystemClock};
use crate::domain::RelayConfig;
use crate::infrastructure::hub::{Hub, HubCommand};

/// How often the accept loop wakes up to check the shutdown flag.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

// ── Public API ────────────────────────────────────────────────────────────────

/// A bound but not yet serving relay.
///
/// Binding and serving are separate steps so that callers (and tests) can
/// bind port `0` and learn the real port from [`RelayServer::local_addr`]
/// before any client connects.
pub struct RelayServer {
    listener: TcpListener,
    config: RelayConfig,
}

impl RelayServer {
    /// Binds the TCP listener on `config.bind_addr`.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails [`RelayConfig::validate`], the port
    /// is already in use, or the process lacks permission to bind.
    pub async fn bind(config: RelayConfig) -> anyhow::Result<Self> {
        config.validate().context("invalid relay configuration")?;
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .with_context(|| format!("failed to bind WebSocket listener on {}", config.bind_addr))?;
        Ok(Self { listener, config })
    }

    /// The address actually bound (resolves port `0`).
    ///
    /// # Errors
    ///
    /// Returns an error if the OS cannot report the socket address.
    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("failed to read listener address")
    }

    /// Starts the hub and accepts connections until `running` is set to
    /// `false`.
    ///
    /// # Errors
    ///
    /// Currently infallible once bound; accept errors are logged and the loop
    /// continues.
    pub async fn serve(self, running: Arc<AtomicBool>) -> anyhow::Result<()> {
        let addr = self.local_addr()?;
        info!("RocketCar relay listening on ws://{addr}");

        let (hub_tx, hub_rx) = mpsc::channel(self.config.hub_capacity);
        let hub = Hub::new(ConnectionHandler::new(SystemClock));
        tokio::spawn(hub.run(hub_rx));

        let config = Arc::new(self.config);

        loop {
            if !running.load(Ordering::Relaxed) {
                info!("shutdown flag set; stopping accept loop");
                break;
            }

            // A short timeout on `accept()` lets the loop notice the shutdown
            // flag even when nobody is connecting.
            match timeout(ACCEPT_POLL, self.listener.accept()).await {
                Ok(Ok((stream, peer_addr))) => {
                    debug!("new connection from {peer_addr}");
                    let cfg = Arc::clone(&config);
                    let hub = hub_tx.clone();
                    tokio::spawn(async move {
                        handle_connection(stream, peer_addr, hub, cfg).await;
                    });
                }
                Ok(Err(e)) => {
                    // Transient (e.g. too many open file descriptors).
                    error!("accept error: {e}");
                }
                Err(_) => {}
            }
        }

        Ok(())
    }
}

/// Binds and serves in one call.  Used by `main.rs`.
///
/// # Errors
///
/// Returns an error if `config` is invalid or the listener cannot be bound.
pub async fn run_server(config: RelayConfig, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    RelayServer::bind(config).await?.serve(running).await
}

// ── Per-connection handler ────────────────────────────────────────────────────

/// Wraps [`run_connection`] and logs the outcome.
async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    hub: mpsc::Sender<HubCommand>,
    config: Arc<RelayConfig>,
) {
    match run_connection(stream, peer_addr, hub, config).await {
        Ok(()) => debug!("connection {peer_addr} closed"),
        Err(e) => warn!("connection {peer_addr} closed with error: {e:#}"),
    }
}

/// Why a connection's pump loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    PeerClosed,
    IdleTimeout,
    SocketError,
    HubGone,
    /// The pump task panicked or was cancelled.
    TaskFailed,
}

/// Runs the complete lifecycle of a single WebSocket connection.
///
/// # Errors
///
/// Returns an error if the WebSocket handshake fails or the hub has already
/// stopped.
async fn run_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    hub: mpsc::Sender<HubCommand>,
    config: Arc<RelayConfig>,
) -> anyhow::Result<()> {
    // `accept_async` answers the HTTP Upgrade request with
    // "101 Switching Protocols"; from here on the stream speaks frames.
    let ws_stream = accept_async(stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    let id = ConnectionId::generate();
    let (outbox_tx, outbox_rx) = mpsc::channel(config.outbox_capacity);
    hub.send(HubCommand::Connect {
        id: id.clone(),
        outbox: outbox_tx,
    })
    .await
    .context("relay hub is not running")?;

    info!(conn = %id, "peer connected from {peer_addr}");

    // The pump runs as its own task so that even a panic inside it ends up
    // here as a `JoinError` instead of skipping the disconnect below.
    let pump_task = tokio::spawn(pump(
        ws_stream,
        id.clone(),
        hub.clone(),
        outbox_rx,
        Arc::clone(&config),
    ));
    let reason = match pump_task.await {
        Ok(reason) => reason,
        Err(e) => {
            error!(conn = %id, "connection task failed: {e}");
            CloseReason::TaskFailed
        }
    };

    // Always tell the hub, whatever ended the loop, so the registry is
    // unwound and the counterpart notified.
    let _ = hub.send(HubCommand::Disconnect { id: id.clone() }).await;
    info!(conn = %id, ?reason, "peer disconnected");
    Ok(())
}

/// Moves frames between one socket and the hub until the connection ends.
async fn pump(
    ws_stream: tokio_tungstenite::WebSocketStream<TcpStream>,
    id: ConnectionId,
    hub: mpsc::Sender<HubCommand>,
    mut outbox: mpsc::Receiver<ServerEvent>,
    config: Arc<RelayConfig>,
) -> CloseReason {
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    let idle_timeout = config.idle_timeout();
    let idle = sleep(idle_timeout);
    tokio::pin!(idle);

    // The first ping goes out one interval after the handshake, not at once.
    // `validate` rules out a zero period, which `interval_at` rejects.
    let mut ticker = interval_at(deadline_after(config.ping_interval), config.ping_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            frame = ws_rx.next() => {
                let msg = match frame {
                    Some(Ok(msg)) => msg,
                    Some(Err(WsError::ConnectionClosed | WsError::Protocol(_))) | None => {
                        return CloseReason::PeerClosed;
                    }
                    Some(Err(e)) => {
                        debug!(conn = %id, "WebSocket read error: {e}");
                        return CloseReason::SocketError;
                    }
                };
                idle.as_mut().reset(deadline_after(idle_timeout));

                match msg {
                    WsMessage::Text(text) => match decode_client_event(&text) {
                        Ok(event) => {
                            let command = HubCommand::Inbound { id: id.clone(), event };
                            if hub.send(command).await.is_err() {
                                return CloseReason::HubGone;
                            }
                        }
                        Err(e) => {
                            // One bad frame does not end the session.
                            warn!(conn = %id, kind = %e.kind(), "frame dropped: {e}");
                        }
                    },
                    WsMessage::Binary(data) => {
                        warn!(conn = %id, "unexpected binary frame ({} bytes) ignored", data.len());
                    }
                    WsMessage::Close(_) => return CloseReason::PeerClosed,
                    // Pings are answered by tungstenite itself; pongs only
                    // matter for the idle deadline reset above.
                    WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => {}
                }
            }

            event = outbox.recv() => {
                let Some(event) = event else {
                    return CloseReason::HubGone;
                };
                let json = match encode_server_event(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        error!(conn = %id, "failed to encode {}: {e}", event.name());
                        continue;
                    }
                };
                if ws_tx.send(WsMessage::Text(json)).await.is_err() {
                    return CloseReason::SocketError;
                }
            }

            _ = ticker.tick() => {
                if ws_tx.send(WsMessage::Ping(Vec::new())).await.is_err() {
                    return CloseReason::SocketError;
                }
            }

            () = &mut idle => {
                debug!(conn = %id, "no traffic for {idle_timeout:?}; closing");
                let _ = ws_tx.send(WsMessage::Close(None)).await;
                return CloseReason::IdleTimeout;
            }
        }
    }
}

/// `now + after`, clamped to a year ahead if the sum does not fit.
fn deadline_after(after: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(after)
        .unwrap_or_else(|| now + Duration::from_secs(365 * 86_400))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
