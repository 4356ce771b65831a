// ABOUTME: Terminal emulator widget for rendering server output in the TUI
// Append-only scrollback of ANSI-colored lines with a blinking cursor

use ansi_to_tui::IntoText;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Widget},
};
use std::collections::VecDeque;
use unicode_width::UnicodeWidthChar;

/// ANSI prefixes used for the session's own status lines
pub const ANSI_RESET: &str = "\x1b[0m";
pub const ANSI_BOLD_RED: &str = "\x1b[1;31m";
pub const ANSI_BOLD_GREEN: &str = "\x1b[1;32m";
pub const ANSI_BOLD_YELLOW: &str = "\x1b[1;33m";

const DEFAULT_MAX_SCROLLBACK: usize = 10_000;

/// Colors and cursor behavior of the terminal pane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalTheme {
    pub background: Color,
    pub foreground: Color,
    pub cursor_blink: bool,
}

impl Default for TerminalTheme {
    fn default() -> Self {
        Self {
            background: Color::Rgb(0x12, 0x12, 0x12),
            foreground: Color::Rgb(0x00, 0xff, 0x00),
            cursor_blink: true,
        }
    }
}

/// Wrap `text` in an ANSI color sequence
pub fn colored(prefix: &str, text: &str) -> String {
    format!("{prefix}{text}{ANSI_RESET}")
}

/// Terminal emulator widget
#[derive(Debug, Clone)]
pub struct TerminalView {
    /// Scrollback buffer, raw lines including escape sequences
    lines: VecDeque<String>,
    max_scrollback: usize,

    /// Current scroll offset (0 = bottom/latest)
    scroll_offset: usize,

    theme: TerminalTheme,

    /// Blink phase; the cursor is drawn while true
    cursor_phase: bool,

    /// SGR sequences still in effect after the last written line
    active_sgr: String,

    title: String,
}

impl TerminalView {
    pub fn new(theme: TerminalTheme) -> Self {
        Self {
            lines: VecDeque::new(),
            max_scrollback: DEFAULT_MAX_SCROLLBACK,
            scroll_offset: 0,
            theme,
            cursor_phase: true,
            active_sgr: String::new(),
            title: String::from("Terminal"),
        }
    }

    pub fn with_max_scrollback(mut self, max_scrollback: usize) -> Self {
        self.max_scrollback = max_scrollback.max(1);
        self
    }

    /// Write `data` followed by a line break, like xterm's `writeln`.
    ///
    /// Colors set on one line stay in effect on the following lines until reset.
    pub fn writeln(&mut self, data: &str) {
        use tracing::trace;

        trace!("Terminal writing {} bytes", data.len());

        for line in data.split('\n') {
            let line = line.trim_end_matches('\r');
            let stored = format!("{}{line}", self.active_sgr);
            self.active_sgr = trailing_sgr(&stored);
            self.lines.push_back(stored);
        }

        while self.lines.len() > self.max_scrollback {
            self.lines.pop_front();
        }

        // New output snaps the view back to the bottom
        self.scroll_offset = 0;
    }

    /// Raw lines in the scrollback, oldest first
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Scrollback with escape sequences stripped
    pub fn plain_lines(&self) -> Vec<String> {
        self.lines
            .iter()
            .map(|line| {
                Self::line_to_text(line)
                    .lines
                    .iter()
                    .flat_map(|l| l.spans.iter().map(|s| s.content.to_string()))
                    .collect()
            })
            .collect()
    }

    /// Scroll up by n lines
    pub fn scroll_up(&mut self, n: usize) {
        let max_scroll = self.lines.len().saturating_sub(1);
        self.scroll_offset = (self.scroll_offset + n).min(max_scroll);
    }

    /// Scroll down by n lines
    pub fn scroll_down(&mut self, n: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(n);
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    /// Check if at bottom
    pub fn is_at_bottom(&self) -> bool {
        self.scroll_offset == 0
    }

    /// Advance the cursor blink phase; no-op when blinking is disabled
    pub fn blink(&mut self) {
        if self.theme.cursor_blink {
            self.cursor_phase = !self.cursor_phase;
        }
    }

    pub fn cursor_visible(&self) -> bool {
        !self.theme.cursor_blink || self.cursor_phase
    }

    fn line_to_text(line: &str) -> Text<'static> {
        line.as_bytes()
            .into_text()
            .unwrap_or_else(|_| Text::raw(line.to_string()))
    }

    /// Screen rows for one stored line, wrapped at `width` columns like xterm
    fn display_rows(line: &str, width: usize) -> Vec<Line<'static>> {
        let text = Self::line_to_text(line);
        if text.lines.is_empty() {
            return vec![Line::default()];
        }
        text.lines
            .into_iter()
            .flat_map(|line| wrap_line(line, width))
            .collect()
    }

    /// Rows visible in a pane of `width` x `height`, bottom-anchored
    fn visible_text(&self, width: usize, height: usize) -> Text<'static> {
        // The cursor row sits below the last line when showing the bottom
        let cursor_row = usize::from(self.is_at_bottom());
        let capacity = height.saturating_sub(cursor_row);

        let end = self.lines.len().saturating_sub(self.scroll_offset);
        let mut rows: VecDeque<Line<'static>> = VecDeque::new();
        for line in self.lines.range(..end).rev() {
            if rows.len() >= capacity {
                break;
            }
            for row in Self::display_rows(line, width).into_iter().rev() {
                rows.push_front(row);
            }
        }
        // A partly visible line keeps its last rows
        while rows.len() > capacity {
            rows.pop_front();
        }

        let mut lines: Vec<Line<'static>> = rows.into();
        if cursor_row == 1 {
            let cursor = if self.cursor_visible() {
                Span::styled(" ", Style::default().add_modifier(Modifier::REVERSED))
            } else {
                Span::raw(" ")
            };
            lines.push(Line::from(cursor));
        }

        Text::from(lines)
    }
}

/// Split a styled line into rows of at most `width` columns
fn wrap_line(line: Line<'static>, width: usize) -> Vec<Line<'static>> {
    if width == 0 {
        return vec![line];
    }

    let mut rows = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut used = 0;

    for span in line.spans {
        let mut chunk = String::new();
        for ch in span.content.chars() {
            let ch_width = ch.width().unwrap_or(0);
            if used > 0 && used + ch_width > width {
                if !chunk.is_empty() {
                    current.push(Span::styled(std::mem::take(&mut chunk), span.style));
                }
                rows.push(Line::from(std::mem::take(&mut current)));
                used = 0;
            }
            chunk.push(ch);
            used += ch_width;
        }
        if !chunk.is_empty() {
            current.push(Span::styled(chunk, span.style));
        }
    }

    rows.push(Line::from(current));
    rows
}

/// SGR sequences of `line` that are still active at its end
fn trailing_sgr(line: &str) -> String {
    let mut active = String::new();
    let mut rest = line;

    while let Some(start) = rest.find("\x1b[") {
        let after = &rest[start + 2..];
        let Some(len) = after.find(|c: char| !(c.is_ascii_digit() || c == ';')) else {
            break;
        };
        if after[len..].starts_with('m') {
            let params = &after[..len];
            let sequence = &rest[start..start + 2 + len + 1];
            if params.is_empty() || params == "0" {
                active.clear();
            } else if params.starts_with("0;") {
                active = sequence.to_string();
            } else {
                active.push_str(sequence);
            }
        }
        rest = &after[len..];
    }

    active
}

impl Widget for &TerminalView {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let base_style = Style::default()
            .bg(self.theme.background)
            .fg(self.theme.foreground);

        let block = Block::default()
            .title(self.title.clone())
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .style(base_style);

        let inner = block.inner(area);
        block.render(area, buf);

        let text = self.visible_text(usize::from(inner.width), usize::from(inner.height));
        Paragraph::new(text).style(base_style).render(inner, buf);

        // Render scroll indicator
        if self.scroll_offset > 0 {
            let indicator = format!(" ▲ {} lines below ", self.scroll_offset);
            buf.set_string(
                area.left() + 2,
                area.top(),
                indicator,
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            );
        }
    }
}
