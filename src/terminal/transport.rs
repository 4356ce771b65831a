// ABOUTME: Transport seam between the terminal session and the Socket.IO client
// Lets the session emit named events without knowing about the network

use serde_json::Value;

use crate::terminal::protocol::ConnectionStatus;

/// Callback invoked with the server's acknowledgment value
pub type AckHandler = Box<dyn FnOnce(Value) + Send + 'static>;

/// Outbound half of an event transport.
///
/// Inbound events are delivered as [`TransportEvent`](crate::terminal::TransportEvent)
/// values over a channel and dispatched by the session's handler table, so the
/// trait only needs to cover emission.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    /// Emit `event` with an optional payload and acknowledgment handler.
    ///
    /// Emission is fire-and-forget: implementations queue or drop the event
    /// depending on connection state and never block the caller.
    fn emit(&self, event: &str, payload: Option<Value>, ack: Option<AckHandler>);

    /// Snapshot of the current connection status
    fn status(&self) -> ConnectionStatus;
}
