use chrono::{DateTime, Local, TimeZone, Utc};
use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, BorderType, Padding, Paragraph, Widget, Wrap};

use crate::core::model::{Avatar, Message, Ownership};
use crate::tui::component::Component;

/// Horizontal padding (per side) between the border and text content.
const CONTENT_PAD_H: u16 = 1;
/// Total horizontal space consumed by borders (1 left + 1 right) and padding.
const HORIZONTAL_OVERHEAD: u16 = 2 + CONTENT_PAD_H * 2;
/// Total vertical space consumed by borders (1 top + 1 bottom).
const VERTICAL_OVERHEAD: u16 = 2;
/// Below this width bubbles use the full row.
const NARROW_WIDTH: u16 = 40;

/// Glyph standing in for the author's picture.
const PHOTO_GLYPH: &str = "◉";
const DEFAULT_GLYPH: &str = "○";

/// A stateless component that renders one chat message as a bubble.
///
/// # Design
///
/// `MessageBubble` is a **transient component**: it's created fresh each
/// frame from a message and the viewer's ownership of it. Nothing global is
/// read; which side the bubble sits on is decided by the `ownership` prop.
///
/// - **Own** (green, right-aligned): written by the viewer
/// - **Other** (blue, left-aligned): everyone else
///
/// The header carries an avatar glyph (filled when the author has a
/// profile picture), the author name and the server time as `HH:MM`.
///
/// # Height Calculation
///
/// [`calculate_height`](Self::calculate_height) predicts the rendered height
/// with `textwrap` options that match ratatui's `Paragraph` wrapping, so the
/// parent list can lay out and scroll without rendering.
#[derive(Clone, Copy)]
pub struct MessageBubble<'a> {
    pub message: &'a Message,
    pub ownership: Ownership,
}

impl<'a> MessageBubble<'a> {
    pub fn new(message: &'a Message, ownership: Ownership) -> Self {
        Self { message, ownership }
    }

    /// Width of the bubble inside a row of `width` columns.
    pub fn bubble_width(width: u16) -> u16 {
        if width < NARROW_WIDTH {
            width
        } else {
            width.saturating_mul(4) / 5
        }
    }

    /// Calculate the height required for this message given the row width.
    pub fn calculate_height(message: &Message, width: u16) -> u16 {
        let content_width = Self::bubble_width(width).saturating_sub(HORIZONTAL_OVERHEAD);
        if content_width == 0 {
            // Terminal too narrow for borders + padding
            return 1;
        }

        let body = message.body.trim();
        if body.is_empty() {
            return 1 + VERTICAL_OVERHEAD;
        }

        let options = textwrap::Options::new(content_width as usize)
            .break_words(true)
            .word_separator(textwrap::WordSeparator::AsciiSpace);

        let lines = textwrap::wrap(body, options);
        (lines.len() as u16).max(1) + VERTICAL_OVERHEAD
    }

    fn header(&self) -> String {
        let glyph = match Avatar::of(self.message) {
            Avatar::Photo(_) => PHOTO_GLYPH,
            Avatar::Default => DEFAULT_GLYPH,
        };
        format!(
            " {} {} · {} ",
            glyph,
            self.message.user,
            format_time(self.message.created_at, &Local)
        )
    }
}

/// Server time rendered as `HH:MM` in the given zone.
pub fn format_time<Tz: TimeZone>(created_at: DateTime<Utc>, zone: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    created_at.with_timezone(zone).format("%H:%M").to_string()
}

impl<'a> Widget for MessageBubble<'a> {
    fn render(self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        let bubble_width = Self::bubble_width(area.width);
        let (x, color, title_alignment) = match self.ownership {
            Ownership::Own => (
                area.x + area.width.saturating_sub(bubble_width),
                Color::Green,
                Alignment::Right,
            ),
            Ownership::Other => (area.x, Color::Blue, Alignment::Left),
        };
        let bubble = Rect::new(x, area.y, bubble_width, area.height);

        let style = Style::default().fg(color);
        let block = Block::bordered()
            .title(self.header())
            .title_alignment(title_alignment)
            .border_type(BorderType::Rounded)
            .border_style(style.add_modifier(Modifier::DIM))
            .title_style(style.add_modifier(Modifier::BOLD))
            .padding(Padding::horizontal(CONTENT_PAD_H));

        let inner = block.inner(bubble);
        block.render(bubble, buf);

        Paragraph::new(self.message.body.trim())
            .wrap(Wrap { trim: true })
            .render(inner, buf);
    }
}

impl<'a> Component for MessageBubble<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        frame.render_widget(*self, area);
    }
}
