// ABOUTME: Socket.IO v5 / Engine.IO v4 packet definitions for the web terminal server
// Text-frame codec used by the WebSocket transport, plus connection state types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Engine.IO protocol revision spoken by the client
pub const ENGINE_IO_VERSION: u8 = 4;

/// Default Socket.IO namespace
pub const DEFAULT_NAMESPACE: &str = "/";

#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("empty packet")]
    Empty,

    #[error("unknown engine.io packet type: {0:?}")]
    UnknownEngineType(char),

    #[error("unknown socket.io packet type: {0:?}")]
    UnknownPacketType(char),

    #[error("invalid ack id: {0}")]
    InvalidAckId(String),

    #[error("invalid packet payload: {0}")]
    InvalidPayload(String),

    #[error("event packet without an event name")]
    MissingEventName,
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        ProtocolError::InvalidPayload(e.to_string())
    }
}

// ============================================
// Engine.IO
// ============================================

/// Handshake carried by the engine.io `open` packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(OpenHandshake),
    Close,
    Ping(Option<String>),
    Pong(Option<String>),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    /// Decode a single engine.io packet from a WebSocket text frame
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let mut chars = text.chars();
        let kind = chars.next().ok_or(ProtocolError::Empty)?;
        let body = chars.as_str();
        let optional_body = || (!body.is_empty()).then(|| body.to_string());

        match kind {
            '0' => Ok(EnginePacket::Open(serde_json::from_str(body)?)),
            '1' => Ok(EnginePacket::Close),
            '2' => Ok(EnginePacket::Ping(optional_body())),
            '3' => Ok(EnginePacket::Pong(optional_body())),
            '4' => Ok(EnginePacket::Message(body.to_string())),
            '5' => Ok(EnginePacket::Upgrade),
            '6' => Ok(EnginePacket::Noop),
            other => Err(ProtocolError::UnknownEngineType(other)),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            EnginePacket::Open(handshake) => {
                format!("0{}", serde_json::to_string(handshake).unwrap_or_default())
            }
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(body) => format!("2{}", body.as_deref().unwrap_or_default()),
            EnginePacket::Pong(body) => format!("3{}", body.as_deref().unwrap_or_default()),
            EnginePacket::Message(body) => format!("4{body}"),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        }
    }
}

// ============================================
// Socket.IO
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Connect,
    Disconnect,
    Event,
    Ack,
    ConnectError,
    BinaryEvent,
    BinaryAck,
}

impl PacketKind {
    fn from_char(c: char) -> Result<Self, ProtocolError> {
        match c {
            '0' => Ok(PacketKind::Connect),
            '1' => Ok(PacketKind::Disconnect),
            '2' => Ok(PacketKind::Event),
            '3' => Ok(PacketKind::Ack),
            '4' => Ok(PacketKind::ConnectError),
            '5' => Ok(PacketKind::BinaryEvent),
            '6' => Ok(PacketKind::BinaryAck),
            other => Err(ProtocolError::UnknownPacketType(other)),
        }
    }

    const fn as_char(self) -> char {
        match self {
            PacketKind::Connect => '0',
            PacketKind::Disconnect => '1',
            PacketKind::Event => '2',
            PacketKind::Ack => '3',
            PacketKind::ConnectError => '4',
            PacketKind::BinaryEvent => '5',
            PacketKind::BinaryAck => '6',
        }
    }

    pub const fn is_binary(self) -> bool {
        matches!(self, PacketKind::BinaryEvent | PacketKind::BinaryAck)
    }
}

/// A socket.io packet carried inside an engine.io `message`
#[derive(Debug, Clone, PartialEq)]
pub struct SocketPacket {
    pub kind: PacketKind,
    pub namespace: String,
    pub ack_id: Option<u64>,
    pub data: Option<Value>,
}

impl SocketPacket {
    /// Namespace connect request
    pub fn connect(namespace: &str) -> Self {
        Self {
            kind: PacketKind::Connect,
            namespace: namespace.to_string(),
            ack_id: None,
            data: None,
        }
    }

    /// Namespace disconnect notification
    pub fn disconnect(namespace: &str) -> Self {
        Self {
            kind: PacketKind::Disconnect,
            namespace: namespace.to_string(),
            ack_id: None,
            data: None,
        }
    }

    /// Named event; `payload` of `None` sends the event name alone
    pub fn event(namespace: &str, name: &str, payload: Option<Value>, ack_id: Option<u64>) -> Self {
        let mut args = vec![Value::String(name.to_string())];
        args.extend(payload);

        Self {
            kind: PacketKind::Event,
            namespace: namespace.to_string(),
            ack_id,
            data: Some(Value::Array(args)),
        }
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let mut chars = text.chars();
        let kind = PacketKind::from_char(chars.next().ok_or(ProtocolError::Empty)?)?;
        let mut rest = chars.as_str();

        // Binary packets carry an attachment count before the namespace
        if kind.is_binary() {
            if let Some(dash) = rest.find('-') {
                rest = &rest[dash + 1..];
            }
        }

        let mut namespace = DEFAULT_NAMESPACE.to_string();
        if rest.starts_with('/') {
            match rest.find(',') {
                Some(comma) => {
                    namespace = rest[..comma].to_string();
                    rest = &rest[comma + 1..];
                }
                None => {
                    namespace = rest.to_string();
                    rest = "";
                }
            }
        }

        let digits = rest.chars().take_while(char::is_ascii_digit).count();
        let ack_id = if digits > 0 {
            let raw = &rest[..digits];
            Some(
                raw.parse::<u64>()
                    .map_err(|_| ProtocolError::InvalidAckId(raw.to_string()))?,
            )
        } else {
            None
        };
        rest = &rest[digits..];

        let data = if rest.is_empty() {
            None
        } else {
            Some(serde_json::from_str(rest)?)
        };

        Ok(Self {
            kind,
            namespace,
            ack_id,
            data,
        })
    }

    pub fn encode(&self) -> String {
        let mut out = String::new();
        out.push(self.kind.as_char());

        if self.namespace != DEFAULT_NAMESPACE {
            out.push_str(&self.namespace);
            out.push(',');
        }

        if let Some(id) = self.ack_id {
            out.push_str(&id.to_string());
        }

        if let Some(data) = &self.data {
            out.push_str(&data.to_string());
        }

        out
    }

    /// Split an event packet into its name and arguments
    pub fn event_parts(&self) -> Result<(String, Vec<Value>), ProtocolError> {
        let Some(Value::Array(items)) = &self.data else {
            return Err(ProtocolError::MissingEventName);
        };

        let mut items = items.iter();
        let name = items
            .next()
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingEventName)?
            .to_string();

        Ok((name, items.cloned().collect()))
    }

    /// Arguments of an ack packet
    pub fn ack_args(&self) -> Vec<Value> {
        match &self.data {
            Some(Value::Array(items)) => items.clone(),
            Some(other) => vec![other.clone()],
            None => Vec::new(),
        }
    }

    /// Human readable reason from a CONNECT_ERROR payload
    pub fn error_message(&self) -> String {
        match &self.data {
            Some(Value::Object(map)) => map
                .get("message")
                .and_then(Value::as_str)
                .map_or_else(|| Value::Object(map.clone()).to_string(), str::to_string),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "connect error".to_string(),
        }
    }
}

// ============================================
// Client-side events
// ============================================

/// Events the transport delivers to the UI loop
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connect,
    ConnectError(String),
    Disconnect(String),
    ReconnectAttempt(u32),
    ReconnectFailed(u32),
    /// Server-sent named event with its first argument (or `null`)
    Event { name: String, payload: Value },
}

impl TransportEvent {
    /// Name under which the session handler table knows this event
    pub fn name(&self) -> &str {
        match self {
            TransportEvent::Connect => "connect",
            TransportEvent::ConnectError(_) => "connect_error",
            TransportEvent::Disconnect(_) => "disconnect",
            TransportEvent::ReconnectAttempt(_) => "reconnect_attempt",
            TransportEvent::ReconnectFailed(_) => "reconnect_failed",
            TransportEvent::Event { name, .. } => name,
        }
    }

    /// Flatten into a (name, payload) pair for table dispatch
    pub fn into_named(self) -> (String, Value) {
        let name = self.name().to_string();
        let payload = match self {
            TransportEvent::Connect => Value::Null,
            TransportEvent::ConnectError(reason) | TransportEvent::Disconnect(reason) => {
                Value::String(reason)
            }
            TransportEvent::ReconnectAttempt(n) | TransportEvent::ReconnectFailed(n) => {
                Value::from(n)
            }
            TransportEvent::Event { payload, .. } => payload,
        };
        (name, payload)
    }
}

// ============================================
// Connection State
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl ConnectionState {
    pub fn indicator(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "◌",
            ConnectionState::Connected => "●",
            ConnectionState::Disconnected => "○",
            ConnectionState::Error => "✗",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Error => "Error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub session_id: Option<String>,
    pub last_error: Option<String>,
    pub reconnect_attempts: u32,
    /// Set once the reconnection budget is spent; emits are dropped from then on
    pub exhausted: bool,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            session_id: None,
            last_error: None,
            reconnect_attempts: 0,
            exhausted: false,
        }
    }
}
