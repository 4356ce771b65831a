// ABOUTME: Screen elements addressable by identifier (terminal, input, button, labels)
// The session binds the elements it needs by id at startup

use crate::terminal::{TerminalTheme, TerminalView};
use std::collections::HashMap;
use unicode_width::UnicodeWidthStr;

pub const TERMINAL_ID: &str = "terminal";
pub const COMMAND_INPUT_ID: &str = "command-input";
pub const EXECUTE_BUTTON_ID: &str = "execute-btn";
pub const CPU_USAGE_ID: &str = "cpu-usage";
pub const RAM_USAGE_ID: &str = "ram-usage";

/// Single-line text input with a cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputField {
    value: String,
    /// Cursor position as a char index into `value`
    cursor: usize,
}

impl InputField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: &str) {
        self.value = value.to_string();
        self.cursor = self.value.chars().count();
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    pub fn insert(&mut self, ch: char) {
        let byte_idx = self.byte_index();
        self.value.insert(byte_idx, ch);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let byte_idx = self.byte_index();
        self.value.remove(byte_idx);
    }

    pub fn delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let byte_idx = self.byte_index();
            self.value.remove(byte_idx);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.value.chars().count());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    /// Display column of the cursor, accounting for wide characters
    pub fn cursor_column(&self) -> u16 {
        let width = self.value[..self.byte_index()].width();
        u16::try_from(width).unwrap_or(u16::MAX)
    }

    fn byte_index(&self) -> usize {
        self.value
            .char_indices()
            .nth(self.cursor)
            .map_or(self.value.len(), |(idx, _)| idx)
    }
}

/// Clickable control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
}

/// Read-only status text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Label {
    text: String,
}

impl Label {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: String) {
        self.text = text;
    }
}

#[derive(Debug, Clone)]
pub enum Element {
    Terminal(Box<TerminalView>),
    Input(InputField),
    Button(Button),
    Label(Label),
}

impl Element {
    pub fn kind(&self) -> &'static str {
        match self {
            Element::Terminal(_) => "terminal",
            Element::Input(_) => "input",
            Element::Button(_) => "button",
            Element::Label(_) => "label",
        }
    }
}

/// Elements of the screen keyed by identifier
#[derive(Debug, Default)]
pub struct Page {
    elements: HashMap<String, Element>,
}

impl Page {
    /// Empty page; elements are added with [`Page::insert`]
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard client screen with every element the session expects
    pub fn standard(theme: TerminalTheme) -> Self {
        let mut page = Self::new();
        page.insert(TERMINAL_ID, Element::Terminal(Box::new(TerminalView::new(theme))));
        page.insert(COMMAND_INPUT_ID, Element::Input(InputField::new()));
        page.insert(
            EXECUTE_BUTTON_ID,
            Element::Button(Button {
                label: "Execute".to_string(),
            }),
        );
        page.insert(CPU_USAGE_ID, Element::Label(Label::new("CPU: --%")));
        page.insert(RAM_USAGE_ID, Element::Label(Label::new("RAM: --%")));
        page
    }

    pub fn insert(&mut self, id: &str, element: Element) {
        self.elements.insert(id.to_string(), element);
    }

    /// Remove an element, handing ownership to the caller
    pub fn take(&mut self, id: &str) -> Option<Element> {
        self.elements.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }
}
