// ABOUTME: Terminal session wiring the transport to the terminal pane and status labels
// Owns the bound screen elements; inbound events are dispatched through an explicit table

use crate::components::page::{
    Button, Element, InputField, Label, Page, COMMAND_INPUT_ID, CPU_USAGE_ID, EXECUTE_BUTTON_ID,
    RAM_USAGE_ID, TERMINAL_ID,
};
use crate::session::payload::{display_value, truthy_field};
use crate::session::router::HandlerTable;
use crate::terminal::protocol::{ConnectionStatus, TransportEvent};
use crate::terminal::terminal_emulator::{
    colored, TerminalView, ANSI_BOLD_GREEN, ANSI_BOLD_RED, ANSI_BOLD_YELLOW,
};
use crate::terminal::transport::Transport;
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing::{debug, error, info};

pub const EXECUTE_COMMAND_EVENT: &str = "execute_command";
pub const GET_RESOURCES_EVENT: &str = "get_resources";

const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("required element `{0}` not found")]
    MissingElement(&'static str),

    #[error("element `{id}` is a {found}, expected a {expected}")]
    WrongElementKind {
        id: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}

pub struct TerminalSession {
    transport: Arc<dyn Transport>,
    terminal: TerminalView,
    command_input: InputField,
    execute_button: Button,
    cpu_usage: Label,
    ram_usage: Label,
}

impl TerminalSession {
    /// Bind the required elements of `page` and take ownership of them.
    ///
    /// Presence of every element is checked before any is removed.
    pub fn attach(page: &mut Page, transport: Arc<dyn Transport>) -> Result<Self, SessionError> {
        for id in [TERMINAL_ID, COMMAND_INPUT_ID, EXECUTE_BUTTON_ID, CPU_USAGE_ID, RAM_USAGE_ID] {
            if !page.contains(id) {
                error!("Startup failed: element {} is missing", id);
                return Err(SessionError::MissingElement(id));
            }
        }

        let terminal = take_element(page, TERMINAL_ID, "terminal", |element| match element {
            Element::Terminal(view) => Ok(*view),
            other => Err(other),
        })?;
        let command_input = take_element(page, COMMAND_INPUT_ID, "input", |element| match element {
            Element::Input(input) => Ok(input),
            other => Err(other),
        })?;
        let execute_button = take_element(page, EXECUTE_BUTTON_ID, "button", |element| match element {
            Element::Button(button) => Ok(button),
            other => Err(other),
        })?;
        let cpu_usage = take_label(page, CPU_USAGE_ID)?;
        let ram_usage = take_label(page, RAM_USAGE_ID)?;

        info!("Terminal session attached");
        Ok(Self {
            transport,
            terminal,
            command_input,
            execute_button,
            cpu_usage,
            ram_usage,
        })
    }

    /// Inbound event bindings
    pub fn handlers() -> &'static HandlerTable<Self> {
        static HANDLERS: OnceLock<HandlerTable<TerminalSession>> = OnceLock::new();
        HANDLERS.get_or_init(|| {
            HandlerTable::<Self>::new()
                .on("connect", Self::on_connect)
                .on("connect_error", Self::on_connect_error)
                .on("disconnect", Self::on_disconnect)
                .on("reconnect_attempt", Self::on_reconnect_attempt)
                .on("reconnect_failed", Self::on_reconnect_failed)
                .on("command_output", Self::on_command_output)
                .on("command_error", Self::on_command_error)
                .on("system_resources", Self::on_system_resources)
        })
    }

    /// Submit the command in the input field.
    ///
    /// Returns false when the trimmed input is empty and nothing was sent.
    pub fn submit_command(&mut self) -> bool {
        let command = self.command_input.value().trim().to_string();
        if command.is_empty() {
            return false;
        }

        debug!("Executing command: {}", command);
        self.terminal
            .writeln(&colored(ANSI_BOLD_YELLOW, &format!("$ {command}")));

        self.transport.emit(
            EXECUTE_COMMAND_EVENT,
            Some(json!({ "command": command })),
            Some(Box::new(|response| {
                debug!("Server response: {}", response);
            })),
        );

        // Cleared right away; the server's answer arrives as separate events
        self.command_input.clear();
        true
    }

    /// Dispatch a transport event through the handler table
    pub fn handle_event(&mut self, event: TransportEvent) -> bool {
        let (name, payload) = event.into_named();
        self.dispatch(&name, payload)
    }

    pub fn dispatch(&mut self, event: &str, payload: Value) -> bool {
        Self::handlers().dispatch(self, event, payload)
    }

    fn on_connect(&mut self, _payload: Value) {
        info!("Connected to WebSocket");
        self.terminal
            .writeln(&colored(ANSI_BOLD_GREEN, "WebSocket Connected"));
    }

    fn on_connect_error(&mut self, payload: Value) {
        let reason = display_value(Some(&payload));
        error!("Connection Error: {}", reason);
        self.terminal
            .writeln(&colored(ANSI_BOLD_RED, &format!("Connection Error: {reason}")));
    }

    fn on_disconnect(&mut self, payload: Value) {
        let reason = display_value(Some(&payload));
        info!("Disconnected: {}", reason);
        self.terminal.writeln(&colored(
            ANSI_BOLD_YELLOW,
            &format!("WebSocket Disconnected: {reason}"),
        ));
    }

    fn on_reconnect_attempt(&mut self, payload: Value) {
        debug!("Reconnect attempt {}", payload);
    }

    fn on_reconnect_failed(&mut self, payload: Value) {
        let attempts = display_value(Some(&payload));
        error!("Reconnection failed after {} attempts", attempts);
        self.terminal.writeln(&colored(
            ANSI_BOLD_RED,
            &format!("Reconnection failed after {attempts} attempts"),
        ));
    }

    fn on_command_output(&mut self, payload: Value) {
        debug!("Received output: {}", payload);
        if let Some(output) = truthy_field(&payload, "output") {
            self.terminal.writeln(&display_value(Some(output)));
        }
    }

    fn on_command_error(&mut self, payload: Value) {
        error!("Command error: {}", payload);
        let message = truthy_field(&payload, "message")
            .map_or_else(|| UNKNOWN_ERROR.to_string(), |m| display_value(Some(m)));
        self.terminal
            .writeln(&colored(ANSI_BOLD_RED, &format!("Error: {message}")));
    }

    fn on_system_resources(&mut self, payload: Value) {
        self.cpu_usage
            .set_text(format!("CPU: {}%", display_value(payload.get("cpu_usage"))));
        self.ram_usage
            .set_text(format!("RAM: {}%", display_value(payload.get("ram_usage"))));
    }

    pub fn terminal(&self) -> &TerminalView {
        &self.terminal
    }

    pub fn terminal_mut(&mut self) -> &mut TerminalView {
        &mut self.terminal
    }

    pub fn command_input(&self) -> &InputField {
        &self.command_input
    }

    pub fn command_input_mut(&mut self) -> &mut InputField {
        &mut self.command_input
    }

    pub fn execute_button(&self) -> &Button {
        &self.execute_button
    }

    pub fn cpu_label(&self) -> &Label {
        &self.cpu_usage
    }

    pub fn ram_label(&self) -> &Label {
        &self.ram_usage
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.transport.status()
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}

fn take_element<T>(
    page: &mut Page,
    id: &'static str,
    expected: &'static str,
    extract: fn(Element) -> Result<T, Element>,
) -> Result<T, SessionError> {
    let element = page.take(id).ok_or(SessionError::MissingElement(id))?;
    extract(element).map_err(|element| {
        let found = element.kind();
        page.insert(id, element);
        SessionError::WrongElementKind {
            id,
            expected,
            found,
        }
    })
}

fn take_label(page: &mut Page, id: &'static str) -> Result<Label, SessionError> {
    take_element(page, id, "label", |element| match element {
        Element::Label(label) => Ok(label),
        other => Err(other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::transport::MockTransport;
    use crate::terminal::TerminalTheme;
    use pretty_assertions::assert_eq;

    fn session_with(mock: MockTransport) -> TerminalSession {
        let mut page = Page::standard(TerminalTheme::default());
        TerminalSession::attach(&mut page, Arc::new(mock)).unwrap()
    }

    #[test]
    fn test_whitespace_command_is_not_sent() {
        let mut mock = MockTransport::new();
        mock.expect_emit().times(0);
        let mut session = session_with(mock);

        for input in ["", "   ", "\t \n"] {
            session.command_input_mut().set_value(input);
            assert!(!session.submit_command());
        }

        assert_eq!(session.terminal().line_count(), 0);
    }

    #[test]
    fn test_command_is_echoed_sent_and_cleared() {
        let mut mock = MockTransport::new();
        mock.expect_emit()
            .withf(|event, payload, ack| {
                event == EXECUTE_COMMAND_EVENT
                    && payload.as_ref() == Some(&json!({"command": "ls -la"}))
                    && ack.is_some()
            })
            .times(1)
            .return_const(());
        let mut session = session_with(mock);

        session.command_input_mut().set_value("  ls -la  ");
        assert!(session.submit_command());

        assert_eq!(session.terminal().plain_lines(), vec!["$ ls -la".to_string()]);
        assert_eq!(session.command_input().value(), "");
    }

    #[test]
    fn test_ack_response_leaves_terminal_untouched() {
        let mut mock = MockTransport::new();
        mock.expect_emit().times(1).returning(|_, _, ack| {
            if let Some(ack) = ack {
                ack(json!({"status": "ok"}));
            }
        });
        let mut session = session_with(mock);

        session.command_input_mut().set_value("pwd");
        session.submit_command();

        assert_eq!(session.terminal().line_count(), 1);
    }

    #[test]
    fn test_output_event_appends_verbatim_line() {
        let mut session = session_with(MockTransport::new());

        session.dispatch("command_output", json!({"output": "hello"}));
        session.dispatch("command_output", json!({}));
        session.dispatch("command_output", json!({"output": ""}));

        assert_eq!(session.terminal().lines().collect::<Vec<_>>(), vec!["hello"]);
    }

    #[test]
    fn test_error_event_uses_message_or_fallback() {
        let mut session = session_with(MockTransport::new());

        session.dispatch("command_error", json!({"message": "bad"}));
        session.dispatch("command_error", json!({}));

        let lines = session.terminal().plain_lines();
        assert_eq!(lines, vec!["Error: bad".to_string(), "Error: Unknown error".to_string()]);
        assert!(session.terminal().lines().all(|l| l.starts_with(ANSI_BOLD_RED)));
    }

    #[test]
    fn test_resources_overwrite_labels() {
        let mut session = session_with(MockTransport::new());

        session.dispatch("system_resources", json!({"cpu_usage": 3.5, "ram_usage": 80}));
        session.dispatch("system_resources", json!({"cpu_usage": 42, "ram_usage": 17}));

        assert_eq!(session.cpu_label().text(), "CPU: 42%");
        assert_eq!(session.ram_label().text(), "RAM: 17%");
        assert_eq!(session.terminal().line_count(), 0);
    }

    #[test]
    fn test_lifecycle_lines() {
        let mut session = session_with(MockTransport::new());

        session.handle_event(TransportEvent::Connect);
        session.handle_event(TransportEvent::ConnectError("timeout".into()));
        session.handle_event(TransportEvent::Disconnect("transport close".into()));
        session.handle_event(TransportEvent::ReconnectAttempt(1));
        session.handle_event(TransportEvent::ReconnectFailed(5));

        assert_eq!(
            session.terminal().plain_lines(),
            vec![
                "WebSocket Connected".to_string(),
                "Connection Error: timeout".to_string(),
                "WebSocket Disconnected: transport close".to_string(),
                "Reconnection failed after 5 attempts".to_string(),
            ]
        );
        assert!(session.terminal().lines().next().unwrap().starts_with(ANSI_BOLD_GREEN));
    }

    #[test]
    fn test_unknown_event_is_ignored() {
        let mut session = session_with(MockTransport::new());
        assert!(!session.dispatch("something_else", json!({"output": "x"})));
        assert_eq!(session.terminal().line_count(), 0);
    }

    #[test]
    fn test_handler_table_covers_inbound_events() {
        let table = TerminalSession::handlers();
        for event in ["connect", "connect_error", "command_output", "command_error", "system_resources"] {
            assert!(table.handles(event), "no handler for {event}");
        }
    }

    #[test]
    fn test_missing_element_is_fatal() {
        let mut page = Page::standard(TerminalTheme::default());
        page.take(RAM_USAGE_ID);

        let err = TerminalSession::attach(&mut page, Arc::new(MockTransport::new())).err();
        assert_eq!(err, Some(SessionError::MissingElement(RAM_USAGE_ID)));
        assert!(page.contains(TERMINAL_ID));
    }

    #[test]
    fn test_wrong_element_kind_is_fatal() {
        let mut page = Page::standard(TerminalTheme::default());
        page.insert(EXECUTE_BUTTON_ID, Element::Label(Label::new("Execute")));

        let err = TerminalSession::attach(&mut page, Arc::new(MockTransport::new())).err();
        assert_eq!(
            err,
            Some(SessionError::WrongElementKind {
                id: EXECUTE_BUTTON_ID,
                expected: "button",
                found: "label",
            })
        );
    }

    #[test]
    fn test_status_comes_from_transport() {
        let mut mock = MockTransport::new();
        mock.expect_status().returning(ConnectionStatus::default);
        let session = session_with(mock);

        assert_eq!(
            session.connection_status().state,
            crate::terminal::ConnectionState::Disconnected
        );
    }
}
