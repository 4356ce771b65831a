// ABOUTME: Terminal session core: event handler table, payload helpers and resource polling

pub mod payload;
pub mod poller;
pub mod router;
pub mod terminal_session;

pub use poller::ResourcePoller;
pub use router::HandlerTable;
pub use terminal_session::{SessionError, TerminalSession};
