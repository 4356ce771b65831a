// ABOUTME: Event handling system for keyboard and mouse input and app actions

use crate::app::AppState;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Quit,
    InputChar(char),
    Backspace,
    Delete,
    CursorLeft,
    CursorRight,
    CursorHome,
    CursorEnd,
    /// Enter in the command input or a click on the execute button
    Submit,
    ScrollUp,
    ScrollDown,
}

/// Lines moved per PageUp/PageDown
const SCROLL_STEP: usize = 10;

pub struct EventHandler;

impl EventHandler {
    pub fn handle_key_event(key_event: KeyEvent) -> Option<AppEvent> {
        if key_event.kind == KeyEventKind::Release {
            return None;
        }

        match key_event.code {
            KeyCode::Char('c') if key_event.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(AppEvent::Quit)
            }
            KeyCode::Esc => Some(AppEvent::Quit),
            KeyCode::Enter => Some(AppEvent::Submit),
            KeyCode::Backspace => Some(AppEvent::Backspace),
            KeyCode::Delete => Some(AppEvent::Delete),
            KeyCode::Left => Some(AppEvent::CursorLeft),
            KeyCode::Right => Some(AppEvent::CursorRight),
            KeyCode::Home => Some(AppEvent::CursorHome),
            KeyCode::End => Some(AppEvent::CursorEnd),
            KeyCode::PageUp => Some(AppEvent::ScrollUp),
            KeyCode::PageDown => Some(AppEvent::ScrollDown),
            KeyCode::Char(ch) if !key_event.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(AppEvent::InputChar(ch))
            }
            _ => None,
        }
    }

    /// Left clicks inside `execute_area` submit the command
    pub fn handle_mouse_event(mouse_event: MouseEvent, execute_area: Rect) -> Option<AppEvent> {
        match mouse_event.kind {
            MouseEventKind::Down(MouseButton::Left)
                if hit(execute_area, mouse_event.column, mouse_event.row) =>
            {
                Some(AppEvent::Submit)
            }
            MouseEventKind::ScrollUp => Some(AppEvent::ScrollUp),
            MouseEventKind::ScrollDown => Some(AppEvent::ScrollDown),
            _ => None,
        }
    }

    pub fn process_event(event: AppEvent, state: &mut AppState) {
        let session = &mut state.session;
        match event {
            AppEvent::Quit => state.quit(),
            AppEvent::InputChar(ch) => session.command_input_mut().insert(ch),
            AppEvent::Backspace => session.command_input_mut().backspace(),
            AppEvent::Delete => session.command_input_mut().delete(),
            AppEvent::CursorLeft => session.command_input_mut().move_left(),
            AppEvent::CursorRight => session.command_input_mut().move_right(),
            AppEvent::CursorHome => session.command_input_mut().move_home(),
            AppEvent::CursorEnd => session.command_input_mut().move_end(),
            AppEvent::Submit => {
                session.submit_command();
            }
            AppEvent::ScrollUp => session.terminal_mut().scroll_up(SCROLL_STEP),
            AppEvent::ScrollDown => session.terminal_mut().scroll_down(SCROLL_STEP),
        }
    }
}

fn hit(area: Rect, column: u16, row: u16) -> bool {
    (area.left()..area.right()).contains(&column) && (area.top()..area.bottom()).contains(&row)
}
