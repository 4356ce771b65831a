// ABOUTME: Rendering tests for the main layout using ratatui's TestBackend

use ratatui::{backend::TestBackend, style::Color, Terminal};
use serde_json::{json, Value};
use socket_term::app::AppState;
use socket_term::components::{LayoutComponent, Page};
use socket_term::session::TerminalSession;
use socket_term::terminal::{
    AckHandler, ConnectionState, ConnectionStatus, TerminalTheme, Transport,
};
use std::sync::{Arc, Mutex};

struct FixedStatusTransport {
    status: Mutex<ConnectionStatus>,
}

impl FixedStatusTransport {
    fn new(state: ConnectionState, reconnect_attempts: u32) -> Self {
        Self {
            status: Mutex::new(ConnectionStatus {
                state,
                reconnect_attempts,
                ..ConnectionStatus::default()
            }),
        }
    }
}

impl Transport for FixedStatusTransport {
    fn emit(&self, _event: &str, _payload: Option<Value>, _ack: Option<AckHandler>) {}

    fn status(&self) -> ConnectionStatus {
        self.status.lock().unwrap().clone()
    }
}

fn create_state(state: ConnectionState, attempts: u32) -> AppState {
    let mut page = Page::standard(TerminalTheme::default());
    let transport = Arc::new(FixedStatusTransport::new(state, attempts));
    AppState::new(TerminalSession::attach(&mut page, transport).unwrap())
}

fn render(state: &AppState, layout: &mut LayoutComponent) -> Vec<String> {
    let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
    terminal.draw(|frame| layout.render(frame, state)).unwrap();

    let buffer = terminal.backend().buffer().clone();
    (0..buffer.area.height)
        .map(|y| {
            (0..buffer.area.width)
                .map(|x| buffer.get(x, y).symbol().to_string())
                .collect()
        })
        .collect()
}

#[test]
fn test_initial_screen() {
    let state = create_state(ConnectionState::Connecting, 0);
    let mut layout = LayoutComponent::new();

    let rows = render(&state, &mut layout);
    let screen = rows.join("\n");

    assert!(screen.contains("Terminal"));
    assert!(screen.contains("Command"));
    assert!(screen.contains("Execute"));
    assert!(screen.contains("CPU: --%"));
    assert!(screen.contains("RAM: --%"));
    assert!(screen.contains("[Enter]run"));
}

#[test]
fn test_resource_update_is_rendered() {
    let mut state = create_state(ConnectionState::Connected, 0);
    state
        .session
        .dispatch("system_resources", json!({"cpu_usage": 42, "ram_usage": 17}));

    let screen = render(&state, &mut LayoutComponent::new()).join("\n");

    assert!(screen.contains("CPU: 42%"));
    assert!(screen.contains("RAM: 17%"));
}

#[test]
fn test_output_appears_in_terminal_pane() {
    let mut state = create_state(ConnectionState::Connected, 0);
    state
        .session
        .dispatch("command_output", json!({"output": "total 0"}));
    state
        .session
        .dispatch("command_error", json!({"message": "Command timed out"}));

    let screen = render(&state, &mut LayoutComponent::new()).join("\n");

    assert!(screen.contains("total 0"));
    assert!(screen.contains("Error: Command timed out"));
    // Escape sequences are interpreted, not printed
    assert!(!screen.contains("[1;31m"));
}

#[test]
fn test_status_bar_shows_reconnect_attempt() {
    let state = create_state(ConnectionState::Connecting, 3);

    let rows = render(&state, &mut LayoutComponent::new());
    let status_bar = rows.last().unwrap();

    assert!(status_bar.contains("(attempt 3)"));
}

#[test]
fn test_status_bar_shows_connection_label() {
    for state in [
        ConnectionState::Connected,
        ConnectionState::Disconnected,
        ConnectionState::Error,
    ] {
        let app_state = create_state(state, 0);
        let rows = render(&app_state, &mut LayoutComponent::new());

        assert!(rows.last().unwrap().contains(state.label()));
    }
}

#[test]
fn test_execute_area_tracks_button() {
    let state = create_state(ConnectionState::Connected, 0);
    let mut layout = LayoutComponent::new();

    let rows = render(&state, &mut layout);
    let area = layout.execute_area();

    assert_eq!(area.width, 13);
    assert_eq!(area.right(), 100);
    let label_row = &rows[usize::from(area.y + 1)];
    assert!(label_row.contains("Execute"));
}

#[test]
fn test_typed_command_is_visible() {
    let mut state = create_state(ConnectionState::Connected, 0);
    state.session.command_input_mut().set_value("uname -a");

    let screen = render(&state, &mut LayoutComponent::new()).join("\n");

    assert!(screen.contains("uname -a"));
}

#[test]
fn test_multiline_error_stays_red() {
    let mut state = create_state(ConnectionState::Connected, 0);
    state
        .session
        .dispatch("command_error", json!({"message": "first\nsecond"}));

    let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
    terminal
        .draw(|frame| LayoutComponent::new().render(frame, &state))
        .unwrap();

    // Terminal pane content starts inside the border at (1, 1)
    let buffer = terminal.backend().buffer();
    assert_eq!(buffer.get(1, 1).symbol(), "E");
    assert_eq!(buffer.get(1, 1).fg, Color::Red);
    assert_eq!(buffer.get(1, 2).symbol(), "s");
    assert_eq!(buffer.get(1, 2).fg, Color::Red);
}

#[test]
fn test_long_output_line_is_fully_visible() {
    let mut state = create_state(ConnectionState::Connected, 0);
    let output = format!("{}TAIL", "x".repeat(120));
    state
        .session
        .dispatch("command_output", json!({ "output": output }));

    let screen = render(&state, &mut LayoutComponent::new()).join("\n");

    assert!(screen.contains("TAIL"));
}
