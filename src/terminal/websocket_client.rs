// ABOUTME: Socket.IO client running over a single WebSocket transport
// Manages connection lifecycle, engine.io heartbeats, acknowledgments and reconnection

use crate::terminal::protocol::{
    ConnectionState, ConnectionStatus, EnginePacket, PacketKind, SocketPacket, TransportEvent,
};
use crate::terminal::transport::{AckHandler, Transport};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::{sleep, sleep_until, timeout, Duration, Instant};
use tokio_tungstenite::{connect_async, tungstenite};
use tracing::{debug, error, info, warn};

/// Connection settings for [`SocketIoClient`]
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Full engine.io WebSocket endpoint, e.g. `ws://host:5000/socket.io/?EIO=4&transport=websocket`
    pub url: String,
    pub namespace: String,
    pub reconnection: bool,
    pub reconnection_attempts: u32,
    pub reconnection_delay: Duration,
    /// Upper bound for the WebSocket and engine.io handshakes
    pub connect_timeout: Duration,
}

impl ClientOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            namespace: "/".to_string(),
            reconnection: true,
            reconnection_attempts: 5,
            reconnection_delay: Duration::from_millis(1000),
            connect_timeout: Duration::from_secs(20),
        }
    }
}

/// Outbound emission waiting for a live connection
struct Outbound {
    event: String,
    payload: Option<Value>,
    ack: Option<AckHandler>,
}

/// How a single connection ended once it had been established
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    /// Client asked to disconnect
    Shutdown,
    /// Server sent a namespace DISCONNECT
    ServerDisconnect,
    /// Server refused the namespace with CONNECT_ERROR
    Rejected(String),
    /// Transport dropped; reconnection applies
    Closed(String),
}

/// State carried across reconnects by the connection loop
struct LoopContext {
    options: ClientOptions,
    status: Arc<RwLock<ConnectionStatus>>,
    outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<TransportEvent>,
    shutdown: watch::Receiver<bool>,
    next_ack_id: u64,
}

pub struct SocketIoClient {
    options: ClientOptions,

    /// Current connection status
    status: Arc<RwLock<ConnectionStatus>>,

    /// Emissions queued until the connection loop can send them
    tx_sender: mpsc::UnboundedSender<Outbound>,
    tx_receiver: Mutex<Option<mpsc::UnboundedReceiver<Outbound>>>,

    /// Lifecycle and server events for the UI loop
    event_sender: mpsc::UnboundedSender<TransportEvent>,

    shutdown: watch::Sender<bool>,

    /// Task handle for the connection loop
    connection_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl SocketIoClient {
    /// Create a client and the receiver its events are delivered on
    pub fn new(options: ClientOptions) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (tx_sender, tx_receiver) = mpsc::unbounded_channel();
        let (event_sender, event_receiver) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);

        let client = Self {
            options,
            status: Arc::new(RwLock::new(ConnectionStatus::default())),
            tx_sender,
            tx_receiver: Mutex::new(Some(tx_receiver)),
            event_sender,
            shutdown,
            connection_handle: Mutex::new(None),
        };

        (client, event_receiver)
    }

    /// Start the connection loop. Returns immediately; progress is reported as events.
    pub async fn connect(&self) {
        let Some(outbound) = self.tx_receiver.lock().await.take() else {
            warn!("Socket.IO client already started, ignoring connect");
            return;
        };

        info!("Starting Socket.IO connection to {}", self.options.url);
        set_state(&self.status, ConnectionState::Connecting);

        let ctx = LoopContext {
            options: self.options.clone(),
            status: self.status.clone(),
            outbound,
            events: self.event_sender.clone(),
            shutdown: self.shutdown.subscribe(),
            next_ack_id: 0,
        };

        let handle = tokio::spawn(Self::connection_loop(ctx));
        *self.connection_handle.lock().await = Some(handle);
    }

    /// Close the connection and stop reconnecting
    pub async fn disconnect(&self) {
        info!("Disconnecting Socket.IO client");
        let _ = self.shutdown.send(true);

        if let Some(mut handle) = self.connection_handle.lock().await.take() {
            if timeout(Duration::from_secs(1), &mut handle).await.is_err() {
                warn!("Connection loop did not stop in time, aborting");
                handle.abort();
            }
        }

        let mut status = write_status(&self.status);
        status.state = ConnectionState::Disconnected;
        status.exhausted = true;
    }

    /// Reconnect loop around [`Self::connection_handler`]
    async fn connection_loop(mut ctx: LoopContext) {
        let mut attempts: u32 = 0;

        loop {
            match Self::connection_handler(&mut ctx).await {
                Ok(SessionEnd::Shutdown) => {
                    info!("Socket.IO connection closed by client");
                    set_state(&ctx.status, ConnectionState::Disconnected);
                    return;
                }
                Ok(SessionEnd::ServerDisconnect) => {
                    info!("Server closed the namespace, not reconnecting");
                    {
                        let mut status = write_status(&ctx.status);
                        status.state = ConnectionState::Disconnected;
                        status.exhausted = true;
                    }
                    let _ = ctx
                        .events
                        .send(TransportEvent::Disconnect("io server disconnect".to_string()));
                    return;
                }
                Ok(SessionEnd::Rejected(reason)) => {
                    error!("Server rejected namespace connect: {}", reason);
                    {
                        let mut status = write_status(&ctx.status);
                        status.state = ConnectionState::Error;
                        status.last_error = Some(reason.clone());
                        status.exhausted = true;
                    }
                    let _ = ctx.events.send(TransportEvent::ConnectError(reason));
                    return;
                }
                Ok(SessionEnd::Closed(reason)) => {
                    warn!("Socket.IO connection lost: {}", reason);
                    attempts = 0;
                    set_state(&ctx.status, ConnectionState::Disconnected);
                    let _ = ctx.events.send(TransportEvent::Disconnect(reason));
                }
                Err(reason) => {
                    error!("Socket.IO connection failed: {}", reason);
                    {
                        let mut status = write_status(&ctx.status);
                        status.state = ConnectionState::Error;
                        status.last_error = Some(reason.clone());
                    }
                    let _ = ctx.events.send(TransportEvent::ConnectError(reason));
                }
            }

            if !ctx.options.reconnection {
                write_status(&ctx.status).exhausted = true;
                return;
            }

            if attempts >= ctx.options.reconnection_attempts {
                warn!("Max reconnection attempts reached ({})", attempts);
                {
                    let mut status = write_status(&ctx.status);
                    status.state = ConnectionState::Disconnected;
                    status.exhausted = true;
                }
                let _ = ctx.events.send(TransportEvent::ReconnectFailed(attempts));
                return;
            }

            attempts += 1;
            {
                let mut status = write_status(&ctx.status);
                status.reconnect_attempts = attempts;
                status.state = ConnectionState::Connecting;
            }

            // Wait before reconnecting
            tokio::select! {
                () = sleep(ctx.options.reconnection_delay) => {}
                _ = ctx.shutdown.changed() => {
                    set_state(&ctx.status, ConnectionState::Disconnected);
                    return;
                }
            }

            info!("Reconnection attempt {}/{}", attempts, ctx.options.reconnection_attempts);
            let _ = ctx.events.send(TransportEvent::ReconnectAttempt(attempts));
        }
    }

    /// Handle a single WebSocket connection.
    ///
    /// `Err` means the connection was never established; once the namespace is
    /// connected, every ending is reported as a [`SessionEnd`].
    async fn connection_handler(ctx: &mut LoopContext) -> Result<SessionEnd, String> {
        debug!("Attempting WebSocket handshake with {}", ctx.options.url);

        let (ws_stream, response) = timeout(ctx.options.connect_timeout, connect_async(ctx.options.url.as_str()))
            .await
            .map_err(|_| "timeout".to_string())?
            .map_err(|e| e.to_string())?;

        debug!("WebSocket response status: {:?}", response.status());
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        let namespace = ctx.options.namespace.clone();
        let mut connected = false;
        let mut pending_acks: HashMap<u64, AckHandler> = HashMap::new();

        // Until the open packet arrives the connect timeout doubles as the heartbeat deadline
        let mut heartbeat_window = ctx.options.connect_timeout;
        let mut deadline = Instant::now() + heartbeat_window;

        loop {
            tokio::select! {
                _ = ctx.shutdown.changed() => {
                    if connected {
                        let packet = EnginePacket::Message(SocketPacket::disconnect(&namespace).encode());
                        let _ = ws_sender.send(tungstenite::Message::Text(packet.encode())).await;
                    }
                    let _ = ws_sender.send(tungstenite::Message::Close(None)).await;
                    return Ok(SessionEnd::Shutdown);
                }

                Some(outbound) = ctx.outbound.recv(), if connected => {
                    let ack_id = outbound.ack.map(|handler| {
                        let id = ctx.next_ack_id;
                        ctx.next_ack_id += 1;
                        pending_acks.insert(id, handler);
                        id
                    });

                    let packet = SocketPacket::event(&namespace, &outbound.event, outbound.payload, ack_id);
                    let frame = EnginePacket::Message(packet.encode()).encode();
                    if let Err(e) = ws_sender.send(tungstenite::Message::Text(frame)).await {
                        error!("Failed to send WebSocket message: {}", e);
                        return Ok(SessionEnd::Closed("transport error".to_string()));
                    }
                    debug!("Sent event: {}", outbound.event);
                }

                () = sleep_until(deadline) => {
                    warn!("No heartbeat from server within {:?}", heartbeat_window);
                    return lost(connected, "ping timeout");
                }

                frame = ws_receiver.next() => {
                    let text = match frame {
                        Some(Ok(tungstenite::Message::Text(text))) => text,
                        Some(Ok(tungstenite::Message::Close(_))) | None => {
                            info!("WebSocket closed by server");
                            return lost(connected, "transport close");
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            error!("WebSocket error: {}", e);
                            return lost(connected, &format!("transport error: {e}"));
                        }
                    };

                    deadline = Instant::now() + heartbeat_window;

                    let packet = match EnginePacket::decode(&text) {
                        Ok(packet) => packet,
                        Err(e) => {
                            warn!("Failed to parse engine.io packet {:?}: {}", text, e);
                            continue;
                        }
                    };

                    match packet {
                        EnginePacket::Open(handshake) => {
                            info!("Engine.IO session opened: {}", handshake.sid);
                            heartbeat_window = Duration::from_millis(handshake.ping_interval + handshake.ping_timeout);
                            deadline = Instant::now() + heartbeat_window;

                            let connect = EnginePacket::Message(SocketPacket::connect(&namespace).encode());
                            if let Err(e) = ws_sender.send(tungstenite::Message::Text(connect.encode())).await {
                                return Err(format!("failed to send namespace connect: {e}"));
                            }
                        }
                        EnginePacket::Ping(body) => {
                            let pong = EnginePacket::Pong(body).encode();
                            if ws_sender.send(tungstenite::Message::Text(pong)).await.is_err() {
                                return lost(connected, "transport error");
                            }
                            debug!("Heartbeat answered");
                        }
                        EnginePacket::Close => {
                            info!("Engine.IO close from server");
                            return lost(connected, "transport close");
                        }
                        EnginePacket::Message(body) => {
                            let packet = match SocketPacket::decode(&body) {
                                Ok(packet) => packet,
                                Err(e) => {
                                    warn!("Failed to parse socket.io packet {:?}: {}", body, e);
                                    continue;
                                }
                            };

                            if packet.namespace != namespace {
                                debug!("Ignoring packet for namespace {}", packet.namespace);
                                continue;
                            }

                            match packet.kind {
                                PacketKind::Connect => {
                                    connected = true;
                                    {
                                        let mut status = write_status(&ctx.status);
                                        status.state = ConnectionState::Connected;
                                        status.last_error = None;
                                        status.reconnect_attempts = 0;
                                        status.session_id = packet
                                            .data
                                            .as_ref()
                                            .and_then(|data| data.get("sid"))
                                            .and_then(Value::as_str)
                                            .map(str::to_string);
                                    }
                                    info!("Socket.IO namespace {} connected", namespace);
                                    let _ = ctx.events.send(TransportEvent::Connect);
                                }
                                PacketKind::ConnectError => {
                                    // A refusal is final; only transport failures are retried
                                    let _ = ws_sender.send(tungstenite::Message::Close(None)).await;
                                    return Ok(SessionEnd::Rejected(packet.error_message()));
                                }
                                PacketKind::Disconnect => {
                                    return Ok(SessionEnd::ServerDisconnect);
                                }
                                PacketKind::Event => {
                                    match packet.event_parts() {
                                        Ok((name, args)) => {
                                            debug!("Received event: {}", name);
                                            let payload = args.into_iter().next().unwrap_or(Value::Null);
                                            let _ = ctx.events.send(TransportEvent::Event { name, payload });
                                        }
                                        Err(e) => warn!("Dropping malformed event: {}", e),
                                    }
                                }
                                PacketKind::Ack => {
                                    let Some(id) = packet.ack_id else {
                                        warn!("Ack packet without id");
                                        continue;
                                    };
                                    match pending_acks.remove(&id) {
                                        Some(handler) => {
                                            handler(packet.ack_args().into_iter().next().unwrap_or(Value::Null));
                                        }
                                        None => debug!("Ack {} has no pending handler", id),
                                    }
                                }
                                PacketKind::BinaryEvent | PacketKind::BinaryAck => {
                                    warn!("Binary socket.io packets are not supported, ignoring");
                                }
                            }
                        }
                        EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => {}
                    }
                }
            }
        }
    }

    /// Get connection status
    pub fn get_status(&self) -> ConnectionStatus {
        read_status(&self.status)
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.get_status().state == ConnectionState::Connected
    }
}

impl Transport for SocketIoClient {
    fn emit(&self, event: &str, payload: Option<Value>, ack: Option<AckHandler>) {
        if read_status(&self.status).exhausted {
            debug!("Dropping {} emit, transport is closed", event);
            return;
        }

        let outbound = Outbound {
            event: event.to_string(),
            payload,
            ack,
        };

        if self.tx_sender.send(outbound).is_err() {
            debug!("Dropping {} emit, connection loop has stopped", event);
        }
    }

    fn status(&self) -> ConnectionStatus {
        self.get_status()
    }
}

fn lost(connected: bool, reason: &str) -> Result<SessionEnd, String> {
    if connected {
        Ok(SessionEnd::Closed(reason.to_string()))
    } else {
        Err(reason.to_string())
    }
}

fn read_status(status: &RwLock<ConnectionStatus>) -> ConnectionStatus {
    status.read().unwrap_or_else(PoisonError::into_inner).clone()
}

fn write_status(status: &RwLock<ConnectionStatus>) -> std::sync::RwLockWriteGuard<'_, ConnectionStatus> {
    status.write().unwrap_or_else(PoisonError::into_inner)
}

fn set_state(status: &RwLock<ConnectionStatus>, state: ConnectionState) {
    write_status(status).state = state;
}
