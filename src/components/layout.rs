// ABOUTME: Main layout component: terminal pane, command input row and status bar

use ratatui::{
    prelude::*,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Paragraph},
};

use crate::app::AppState;
use crate::terminal::ConnectionState;

const BUTTON_WIDTH: u16 = 13;

pub struct LayoutComponent {
    /// Where the execute button was last drawn, for mouse hit testing
    execute_area: Rect,
}

impl LayoutComponent {
    pub fn new() -> Self {
        Self {
            execute_area: Rect::default(),
        }
    }

    pub fn execute_area(&self) -> Rect {
        self.execute_area
    }

    pub fn render(&mut self, frame: &mut Frame, state: &AppState) {
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),    // Terminal
                Constraint::Length(3), // Command row
                Constraint::Length(1), // Status bar
            ])
            .split(frame.size());

        frame.render_widget(state.session.terminal(), main_chunks[0]);

        let input_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(10), Constraint::Length(BUTTON_WIDTH)])
            .split(main_chunks[1]);

        self.render_input(frame, input_chunks[0], state);
        self.render_button(frame, input_chunks[1], state);
        self.render_status_bar(frame, main_chunks[2], state);
    }

    fn render_input(&self, frame: &mut Frame, area: Rect, state: &AppState) {
        let input = state.session.command_input();

        let block = Block::default()
            .title("Command")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(area);

        let paragraph = Paragraph::new(input.value().to_string())
            .block(block)
            .style(Style::default().fg(Color::White));
        frame.render_widget(paragraph, area);

        if inner.width > 0 && inner.height > 0 {
            let column = input.cursor_column().min(inner.width - 1);
            frame.set_cursor(inner.x + column, inner.y);
        }
    }

    fn render_button(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
        self.execute_area = area;

        let button = Paragraph::new(state.session.execute_button().label.clone())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Yellow)),
            )
            .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center);

        frame.render_widget(button, area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect, state: &AppState) {
        let status = state.session.connection_status();
        let state_color = match status.state {
            ConnectionState::Connected => Color::Green,
            ConnectionState::Connecting => Color::Yellow,
            ConnectionState::Disconnected => Color::Gray,
            ConnectionState::Error => Color::Red,
        };

        let mut connection = format!("{} {}", status.state.indicator(), status.state.label());
        if status.state == ConnectionState::Connecting && status.reconnect_attempts > 0 {
            connection.push_str(&format!(" (attempt {})", status.reconnect_attempts));
        }

        let line = Line::from(vec![
            Span::styled(
                format!(" {} ", state.session.cpu_label().text()),
                Style::default().fg(Color::Cyan),
            ),
            Span::styled(
                format!(" {} ", state.session.ram_label().text()),
                Style::default().fg(Color::Cyan),
            ),
            Span::raw(" │ "),
            Span::styled(connection, Style::default().fg(state_color)),
            Span::raw(" │ "),
            Span::styled(
                "[Enter]run [PgUp/PgDn]scroll [Esc]quit",
                Style::default().fg(Color::DarkGray),
            ),
        ]);

        frame.render_widget(Paragraph::new(line), area);
    }
}

impl Default for LayoutComponent {
    fn default() -> Self {
        Self::new()
    }
}
