// ABOUTME: Behavior tests for the terminal session against a recording transport
// Covers command submission and every inbound event the server can send

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use socket_term::components::page::{Page, CPU_USAGE_ID, TERMINAL_ID};
use socket_term::session::{SessionError, TerminalSession};
use socket_term::terminal::{AckHandler, ConnectionStatus, TerminalTheme, Transport, TransportEvent};
use std::sync::{Arc, Mutex};

struct Emitted {
    event: String,
    payload: Option<Value>,
    ack: Option<AckHandler>,
}

#[derive(Default)]
struct RecordingTransport {
    emitted: Mutex<Vec<Emitted>>,
}

impl RecordingTransport {
    fn events(&self) -> Vec<(String, Option<Value>)> {
        self.emitted
            .lock()
            .unwrap()
            .iter()
            .map(|e| (e.event.clone(), e.payload.clone()))
            .collect()
    }
}

impl Transport for RecordingTransport {
    fn emit(&self, event: &str, payload: Option<Value>, ack: Option<AckHandler>) {
        self.emitted.lock().unwrap().push(Emitted {
            event: event.to_string(),
            payload,
            ack,
        });
    }

    fn status(&self) -> ConnectionStatus {
        ConnectionStatus::default()
    }
}

fn create_session() -> (TerminalSession, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::default());
    let mut page = Page::standard(TerminalTheme::default());
    let session = TerminalSession::attach(&mut page, transport.clone()).unwrap();
    (session, transport)
}

fn submit(session: &mut TerminalSession, input: &str) -> bool {
    session.command_input_mut().set_value(input);
    session.submit_command()
}

#[test]
fn test_blank_commands_produce_nothing() {
    let (mut session, transport) = create_session();

    for input in ["", " ", "\t", "  \n  "] {
        assert!(!submit(&mut session, input));
    }

    assert_eq!(session.terminal().line_count(), 0);
    assert!(transport.events().is_empty());
}

#[test]
fn test_command_submission_contract() {
    let (mut session, transport) = create_session();

    assert!(submit(&mut session, "  ls -la /tmp "));

    // One echo line, one request carrying the trimmed command, empty input
    assert_eq!(session.terminal().plain_lines(), vec!["$ ls -la /tmp".to_string()]);
    assert_eq!(
        transport.events(),
        vec![("execute_command".to_string(), Some(json!({"command": "ls -la /tmp"})))]
    );
    assert_eq!(session.command_input().value(), "");
}

#[test]
fn test_echo_line_is_bold_yellow() {
    let (mut session, _) = create_session();
    submit(&mut session, "pwd");

    let raw = session.terminal().lines().next().unwrap().to_string();
    assert_eq!(raw, "\x1b[1;33m$ pwd\x1b[0m");
}

#[test]
fn test_ack_only_logs() {
    let (mut session, transport) = create_session();
    submit(&mut session, "whoami");

    let ack = transport.emitted.lock().unwrap()[0].ack.take();
    let ack = ack.expect("execute_command carries an ack handler");
    ack(json!({"status": "success"}));

    assert_eq!(session.terminal().line_count(), 1);
    assert_eq!(session.command_input().value(), "");
}

#[test]
fn test_output_lines() {
    let (mut session, _) = create_session();

    session.dispatch("command_output", json!({"output": "hello"}));
    assert_eq!(session.terminal().lines().collect::<Vec<_>>(), vec!["hello"]);

    session.dispatch("command_output", json!({}));
    session.dispatch("command_output", json!({"output": null}));
    assert_eq!(session.terminal().line_count(), 1);
}

#[test]
fn test_output_is_written_verbatim() {
    let (mut session, _) = create_session();

    session.dispatch("command_output", json!({"output": "\x1b[34mdir\x1b[0m  file"}));

    assert_eq!(
        session.terminal().lines().collect::<Vec<_>>(),
        vec!["\x1b[34mdir\x1b[0m  file"]
    );
}

#[test]
fn test_error_lines() {
    let (mut session, _) = create_session();

    session.dispatch("command_error", json!({"message": "bad"}));
    session.dispatch("command_error", json!({}));
    session.dispatch("command_error", json!({"status": "error", "message": "Unsafe or blocked command"}));

    let lines = session.terminal().plain_lines();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("bad"));
    assert!(lines[1].contains("Unknown error"));
    assert_eq!(lines[2], "Error: Unsafe or blocked command");
}

#[test]
fn test_multiline_error_colors_every_line() {
    let (mut session, _) = create_session();

    session.dispatch("command_error", json!({"message": "first\nsecond"}));
    session.dispatch("command_output", json!({"output": "after"}));

    assert_eq!(
        session.terminal().lines().collect::<Vec<_>>(),
        vec![
            "\x1b[1;31mError: first",
            "\x1b[1;31msecond\x1b[0m",
            "after",
        ]
    );
}

#[test]
fn test_resource_labels() {
    let (mut session, _) = create_session();

    session.dispatch("system_resources", json!({"cpu_usage": 42, "ram_usage": 17}));
    assert_eq!(session.cpu_label().text(), "CPU: 42%");
    assert_eq!(session.ram_label().text(), "RAM: 17%");

    session.dispatch("system_resources", json!({"cpu_usage": 7.3, "ram_usage": 61.25}));
    assert_eq!(session.cpu_label().text(), "CPU: 7.3%");
    assert_eq!(session.ram_label().text(), "RAM: 61.25%");
}

#[test]
fn test_connection_lines() {
    let (mut session, _) = create_session();

    session.handle_event(TransportEvent::Connect);
    session.handle_event(TransportEvent::ConnectError("websocket error".to_string()));

    assert_eq!(
        session.terminal().lines().collect::<Vec<_>>(),
        vec![
            "\x1b[1;32mWebSocket Connected\x1b[0m",
            "\x1b[1;31mConnection Error: websocket error\x1b[0m",
        ]
    );
}

#[test]
fn test_errors_do_not_block_submission() {
    let (mut session, transport) = create_session();

    session.handle_event(TransportEvent::ConnectError("refused".to_string()));
    session.dispatch("command_error", json!({}));
    assert!(submit(&mut session, "date"));

    assert_eq!(transport.events().len(), 1);
}

#[test]
fn test_missing_terminal_fails_startup() {
    let mut page = Page::standard(TerminalTheme::default());
    page.take(TERMINAL_ID);

    let result = TerminalSession::attach(&mut page, Arc::new(RecordingTransport::default()));

    let err = result.err().unwrap();
    assert_eq!(err, SessionError::MissingElement(TERMINAL_ID));
    assert_eq!(err.to_string(), "required element `terminal` not found");
}

#[test]
fn test_empty_page_fails_startup() {
    let mut page = Page::new();
    let result = TerminalSession::attach(&mut page, Arc::new(RecordingTransport::default()));
    assert!(matches!(result, Err(SessionError::MissingElement(_))));

    let mut page = Page::standard(TerminalTheme::default());
    page.take(CPU_USAGE_ID);
    let result = TerminalSession::attach(&mut page, Arc::new(RecordingTransport::default()));
    assert!(matches!(result, Err(SessionError::MissingElement(CPU_USAGE_ID))));
}
