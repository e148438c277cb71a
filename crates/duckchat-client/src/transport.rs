//! Socket.IO over WebSocket transport.
//!
//! Provides [`ConnectionHandle`], which owns one background task speaking
//! Engine.IO v4 / Socket.IO v5 on a WebSocket, and [`SocketIoDriver`], which
//! adapts it to the [`Driver`] trait. This is a thin layer that moves events
//! and reports transport lifecycle; room logic stays in the Sans-IO core.
//!
//! The task answers server heartbeats, treats a missed heartbeat as a drop,
//! and reconnects on its own up to [`ReconnectPolicy::max_attempts`] times.
//! Reconnect spacing sleeps through the [`Environment`], so simulated time
//! covers it.
//! The very first connection is not retried: an unreachable endpoint is
//! reported as [`TransportEvent::Failed`] straight away.

use std::time::Duration;

use duckchat_app::Driver;
use duckchat_core::{Environment, TransportEvent};
use duckchat_proto::{Event, Handshake, Packet, ProtocolError};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message,
};
use url::Url;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Endpoint URL is malformed.
    #[error("invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint {
        /// Endpoint as given.
        endpoint: String,
        /// Parse failure.
        reason: String,
    },

    /// WebSocket failed to connect, read, or write.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// Engine.IO or Socket.IO handshake did not complete.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Server refused the Socket.IO connection.
    #[error("connection refused by server: {0}")]
    Rejected(String),

    /// Server sent a frame the codec rejected.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// No connection is open.
    #[error("not connected")]
    NotConnected,

    /// Connection task has exited.
    #[error("connection task closed")]
    ChannelClosed,
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(e.to_string())
    }
}

/// How the transport retries after a drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Attempts after a drop before reporting failure.
    pub max_attempts: u32,
    /// Delay before each attempt.
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_attempts: 5, delay: Duration::from_secs(1) }
    }
}

/// Handle to a live-channel connection task.
///
/// Events are sent and transport reports received through the channels; an
/// internal task does the WebSocket I/O.
pub struct ConnectionHandle {
    /// Send events to the server.
    pub to_server: mpsc::Sender<Event>,
    /// Transport reports, in order.
    pub from_server: mpsc::Receiver<TransportEvent>,
    /// Abort handle to stop the connection task.
    abort_handle: tokio::task::AbortHandle,
}

impl ConnectionHandle {
    /// Close gracefully: queued events are flushed, a Socket.IO disconnect is
    /// sent, then the socket closes.
    pub fn close(self) {
        drop(self.to_server);
    }

    /// Stop the connection immediately.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

/// Start a connection task for `endpoint`.
///
/// Must be called within a tokio runtime. Connection progress is reported on
/// [`ConnectionHandle::from_server`].
///
/// # Errors
///
/// - `TransportError::InvalidEndpoint` if `endpoint` is not a ws(s) URL
pub fn connect<E: Environment>(
    env: E,
    endpoint: &str,
    policy: ReconnectPolicy,
) -> Result<ConnectionHandle, TransportError> {
    let url = Url::parse(endpoint).map_err(|e| TransportError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(TransportError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: "expected ws or wss".to_string(),
        });
    }

    let (to_server_tx, to_server_rx) = mpsc::channel::<Event>(32);
    let (from_server_tx, from_server_rx) = mpsc::channel::<TransportEvent>(32);

    let handle = tokio::spawn(run_connection(env, url, policy, to_server_rx, from_server_tx));

    Ok(ConnectionHandle {
        to_server: to_server_tx,
        from_server: from_server_rx,
        abort_handle: handle.abort_handle(),
    })
}

/// Why a connected socket stopped.
enum Exit {
    /// The handle closed the connection.
    Closed,
    /// The socket dropped; reconnect.
    Lost(String),
}

/// Connect, pump, and reconnect until closed or out of attempts.
async fn run_connection<E: Environment>(
    env: E,
    url: Url,
    policy: ReconnectPolicy,
    mut to_server: mpsc::Receiver<Event>,
    from_server: mpsc::Sender<TransportEvent>,
) {
    let mut established = false;
    let mut attempts = 0;
    let mut lost_at = None;

    loop {
        match open_socket(&url).await {
            Ok((socket, handshake)) => {
                let report = if established {
                    let outage = lost_at.take().map(|at| env.now() - at);
                    tracing::info!(%url, ?outage, "live channel reconnected");
                    TransportEvent::Reconnected
                } else {
                    tracing::info!(%url, sid = %handshake.sid, "live channel open");
                    TransportEvent::Opened
                };
                established = true;
                attempts = 0;

                if from_server.send(report).await.is_err() {
                    return;
                }

                match pump(socket, &handshake, &mut to_server, &from_server).await {
                    Exit::Closed => {
                        let _ = from_server.send(TransportEvent::Closed).await;
                        return;
                    },
                    Exit::Lost(reason) => {
                        tracing::warn!(%url, %reason, "live channel lost");
                        lost_at = Some(env.now());
                        if from_server.send(TransportEvent::Lost { reason }).await.is_err() {
                            return;
                        }
                    },
                }
            },

            Err(e) if !established => {
                let _ = from_server.send(TransportEvent::Failed { reason: e.to_string() }).await;
                return;
            },

            Err(e) => {
                attempts += 1;
                tracing::warn!(%url, attempts, error = %e, "reconnect attempt failed");
                if attempts >= policy.max_attempts {
                    let reason = format!("gave up after {attempts} reconnect attempts: {e}");
                    let _ = from_server.send(TransportEvent::Failed { reason }).await;
                    return;
                }
            },
        }

        if policy.max_attempts == 0 {
            let reason = "reconnection disabled".to_string();
            let _ = from_server.send(TransportEvent::Failed { reason }).await;
            return;
        }

        env.sleep(policy.delay).await;
    }
}

/// Open the WebSocket and complete the Engine.IO and Socket.IO handshakes.
async fn open_socket(url: &Url) -> Result<(Socket, Handshake), TransportError> {
    let (mut socket, _response) = connect_async(url.as_str()).await?;

    let handshake = match next_packet(&mut socket).await? {
        Packet::Open(handshake) => handshake,
        other => {
            return Err(TransportError::Handshake(format!("expected open, got {other:?}")));
        },
    };

    send_packet(&mut socket, &Packet::Connect { sid: None }).await?;

    loop {
        match next_packet(&mut socket).await? {
            Packet::Connect { .. } => return Ok((socket, handshake)),
            Packet::ConnectError { message } => return Err(TransportError::Rejected(message)),
            Packet::Ping => send_packet(&mut socket, &Packet::Pong).await?,
            other => tracing::debug!(?other, "ignoring packet during handshake"),
        }
    }
}

/// Read frames until one decodes into a packet.
async fn next_packet(socket: &mut Socket) -> Result<Packet, TransportError> {
    loop {
        let Some(message) = socket.next().await else {
            return Err(TransportError::Handshake("socket closed".to_string()));
        };

        match message? {
            Message::Text(text) => return Ok(Packet::decode(text.as_str())?),
            Message::Close(_) => return Err(TransportError::Handshake("socket closed".to_string())),
            _ => {},
        }
    }
}

async fn send_packet(socket: &mut Socket, packet: &Packet) -> Result<(), TransportError> {
    socket.send(Message::text(packet.encode()?)).await?;
    Ok(())
}

/// Move events both ways until the handle closes or the socket drops.
async fn pump(
    socket: Socket,
    handshake: &Handshake,
    to_server: &mut mpsc::Receiver<Event>,
    from_server: &mpsc::Sender<TransportEvent>,
) -> Exit {
    let (mut sink, mut stream) = socket.split();
    let liveness =
        Duration::from_millis(handshake.ping_interval.saturating_add(handshake.ping_timeout));

    loop {
        tokio::select! {
            outgoing = to_server.recv() => {
                let Some(event) = outgoing else {
                    if let Ok(text) = Packet::Disconnect.encode() {
                        let _ = sink.send(Message::text(text)).await;
                    }
                    let _ = sink.close().await;
                    return Exit::Closed;
                };

                let text = match Packet::Event(event).encode() {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(error = %e, "dropping unencodable event");
                        continue;
                    },
                };
                if let Err(e) = sink.send(Message::text(text)).await {
                    return Exit::Lost(e.to_string());
                }
            },

            incoming = tokio::time::timeout(liveness, stream.next()) => {
                let message = match incoming {
                    Err(_) => return Exit::Lost("heartbeat timeout".to_string()),
                    Ok(None) => return Exit::Lost("socket closed".to_string()),
                    Ok(Some(Err(e))) => return Exit::Lost(e.to_string()),
                    Ok(Some(Ok(message))) => message,
                };

                let text = match message {
                    Message::Text(text) => text,
                    Message::Close(_) => return Exit::Lost("closed by server".to_string()),
                    _ => continue,
                };

                match Packet::decode(text.as_str()) {
                    Ok(Packet::Ping) => {
                        if let Ok(pong) = Packet::Pong.encode()
                            && let Err(e) = sink.send(Message::text(pong)).await
                        {
                            return Exit::Lost(e.to_string());
                        }
                    },
                    Ok(Packet::Event(event)) => {
                        if from_server.send(TransportEvent::Inbound(event)).await.is_err() {
                            return Exit::Closed;
                        }
                    },
                    Ok(Packet::Disconnect | Packet::Close) => {
                        return Exit::Lost("disconnected by server".to_string());
                    },
                    Ok(other) => tracing::debug!(?other, "ignoring packet"),
                    Err(e) => tracing::warn!(error = %e, "undecodable packet"),
                }
            },
        }
    }
}

/// [`Driver`] over a Socket.IO WebSocket.
pub struct SocketIoDriver<E: Environment> {
    env: E,
    policy: ReconnectPolicy,
    handle: Option<ConnectionHandle>,
}

impl<E: Environment> SocketIoDriver<E> {
    /// Create a driver. Nothing connects until [`Driver::connect`].
    pub fn new(env: E, policy: ReconnectPolicy) -> Self {
        Self { env, policy, handle: None }
    }
}

impl<E: Environment> Driver for SocketIoDriver<E> {
    type Error = TransportError;

    async fn connect(&mut self, endpoint: &str) -> Result<(), TransportError> {
        if let Some(old) = self.handle.take() {
            old.stop();
        }
        self.handle = Some(connect(self.env.clone(), endpoint, self.policy)?);
        Ok(())
    }

    async fn send_event(&mut self, event: Event) -> Result<(), TransportError> {
        let Some(handle) = self.handle.as_ref() else {
            return Err(TransportError::NotConnected);
        };
        handle.to_server.send(event).await.map_err(|_| TransportError::ChannelClosed)
    }

    async fn recv(&mut self) -> Option<TransportEvent> {
        match self.handle.as_mut() {
            Some(handle) => handle.from_server.recv().await,
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.close();
        }
    }
}
