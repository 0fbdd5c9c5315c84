//! # ComposeBox Component
//!
//! Single-line draft editor under the feed.
//!
//! The box owns the text buffer and cursor. Every edit emits
//! [`ComposeEvent::Changed`] so the core draft stays in sync keystroke by
//! keystroke; Enter emits [`ComposeEvent::Submit`] only while `can_send`
//! is set, which the parent derives from the core feed state. The send
//! indicator is dimmed while sending is disabled.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;
use ratatui::widgets::{Block, BorderType, Paragraph};
use unicode_width::UnicodeWidthStr;

use crate::tui::component::{Component, EventHandler};
use crate::tui::event::TuiEvent;

/// Rows taken by the box (text line plus borders).
pub const COMPOSE_HEIGHT: u16 = 3;
const SEND_LABEL: &str = " ⏎ send ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeEvent {
    /// Draft text changed. Carries the full new text.
    Changed(String),
    Submit,
}

#[derive(Debug, Default)]
pub struct ComposeBox {
    buffer: String,
    /// Cursor position as a char index into `buffer`.
    cursor: usize,
    /// Prop: whether the send control is enabled.
    pub can_send: bool,
}

impl ComposeBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.buffer
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.buffer.len())
    }

    fn char_count(&self) -> usize {
        self.buffer.chars().count()
    }

    fn insert_str(&mut self, text: &str) {
        let at = self.byte_index(self.cursor);
        self.buffer.insert_str(at, text);
        self.cursor += text.chars().count();
    }

    /// Display column of the cursor.
    fn cursor_column(&self) -> u16 {
        let before = &self.buffer[..self.byte_index(self.cursor)];
        before.width() as u16
    }
}

impl EventHandler for ComposeBox {
    type Event = ComposeEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<ComposeEvent> {
        match event {
            TuiEvent::Submit => {
                return self.can_send.then_some(ComposeEvent::Submit);
            }
            TuiEvent::InputChar(c) => {
                let mut tmp = [0u8; 4];
                self.insert_str(c.encode_utf8(&mut tmp));
            }
            TuiEvent::Paste(text) => {
                // One line only
                let flat: String = text
                    .chars()
                    .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
                    .collect();
                self.insert_str(&flat);
            }
            TuiEvent::Backspace => {
                if self.cursor == 0 {
                    return None;
                }
                self.cursor -= 1;
                let at = self.byte_index(self.cursor);
                self.buffer.remove(at);
            }
            TuiEvent::Delete => {
                if self.cursor >= self.char_count() {
                    return None;
                }
                let at = self.byte_index(self.cursor);
                self.buffer.remove(at);
            }
            TuiEvent::CursorLeft => {
                self.cursor = self.cursor.saturating_sub(1);
                return None;
            }
            TuiEvent::CursorRight => {
                self.cursor = (self.cursor + 1).min(self.char_count());
                return None;
            }
            TuiEvent::CursorHome => {
                self.cursor = 0;
                return None;
            }
            TuiEvent::CursorEnd => {
                self.cursor = self.char_count();
                return None;
            }
            _ => return None,
        }
        Some(ComposeEvent::Changed(self.buffer.clone()))
    }
}

impl Component for ComposeBox {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let send_style = if self.can_send {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM)
        };

        let block = Block::bordered()
            .title(" Message ")
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::DarkGray));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let send_width = SEND_LABEL.width() as u16;
        let [text_area, send_area] =
            Layout::horizontal([Constraint::Min(1), Constraint::Length(send_width)]).areas(inner);

        // Scroll horizontally so the cursor stays visible
        let cursor_col = self.cursor_column();
        let scroll = cursor_col.saturating_sub(text_area.width.saturating_sub(1));
        frame.render_widget(
            Paragraph::new(self.buffer.as_str()).scroll((0, scroll)),
            text_area,
        );
        frame.render_widget(Span::styled(SEND_LABEL, send_style), send_area);

        if text_area.width > 0 && text_area.height > 0 {
            frame.set_cursor_position(Position {
                x: text_area.x + cursor_col - scroll,
                y: text_area.y,
            });
        }
    }
}
