// ABOUTME: Terminal module for the Socket.IO transport and terminal emulation
// Provides a WebSocket-only Socket.IO client and the terminal pane widget

pub mod protocol;
pub mod terminal_emulator;
pub mod transport;
pub mod websocket_client;

pub use protocol::{ConnectionState, ConnectionStatus, TransportEvent};
pub use terminal_emulator::{TerminalTheme, TerminalView};
pub use transport::{AckHandler, Transport};
pub use websocket_client::{ClientOptions, SocketIoClient};
