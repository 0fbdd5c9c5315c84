//! # MessageList Component
//!
//! Scrollable view of the live feed.
//!
//! ## Responsibilities
//!
//! - Render one bubble per message, oldest at the top
//! - Keep the newest message in view while the viewer is at the bottom
//! - Cache bubble heights per message id
//!
//! ## Architecture
//!
//! `MessageList` is a transient component (created each frame) that wraps
//! `&'a mut MessageListState` (persistent state) and the message slice
//! (props). Every snapshot replaces the whole list, but most messages are
//! the same ones as last time, so heights are looked up by id instead of
//! by position.

use std::collections::{HashMap, HashSet};

use ratatui::Frame;
use ratatui::layout::{Alignment, Position, Rect, Size};
use ratatui::style::{Color, Style};
use ratatui::widgets::Paragraph;
use tui_scrollview::{ScrollView, ScrollViewState, ScrollbarVisibility};

use crate::core::model::{Message, Ownership};
use crate::tui::component::{Component, EventHandler};
use crate::tui::components::message::MessageBubble;
use crate::tui::event::TuiEvent;

/// Layout and scroll state for the message list.
/// Must be persisted in the parent TuiState.
pub struct MessageListState {
    pub scroll_state: ScrollViewState,
    pub layout: LayoutCache,
    /// When true, the view follows the newest message.
    pub stick_to_bottom: bool,
    /// Last known viewport height (for scroll clamping between frames)
    pub viewport_height: u16,
}

impl Default for MessageListState {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageListState {
    pub fn new() -> Self {
        Self {
            scroll_state: ScrollViewState::default(),
            layout: LayoutCache::new(),
            stick_to_bottom: true,
            viewport_height: 0,
        }
    }

    fn max_offset(&self) -> u16 {
        self.layout.total_height().saturating_sub(self.viewport_height)
    }

    /// Clamp scroll offset so it never exceeds the content bounds.
    pub fn clamp_scroll(&mut self) {
        let max_y = self.max_offset();
        let current = self.scroll_state.offset();
        if current.y > max_y {
            self.scroll_state.set_offset(Position {
                x: current.x,
                y: max_y,
            });
        }
    }

    /// Re-engage auto-scroll once the viewer scrolls back to the bottom.
    pub fn repin_if_at_bottom(&mut self) {
        let max_y = self.max_offset();
        let current = self.scroll_state.offset();
        if current.y >= max_y {
            self.stick_to_bottom = true;
            self.scroll_state.set_offset(Position {
                x: current.x,
                y: max_y,
            });
        }
    }

    /// Bring the end of the feed into view on the next render.
    pub fn scroll_to_latest(&mut self) {
        self.stick_to_bottom = true;
    }
}

/// Scrollable feed view.
/// Created fresh each frame with references to state and data.
pub struct MessageList<'a> {
    pub state: &'a mut MessageListState,
    pub messages: &'a [Message],
    /// Decides which bubbles are the viewer's own.
    pub viewer_uid: &'a str,
}

impl<'a> MessageList<'a> {
    pub fn new(state: &'a mut MessageListState, messages: &'a [Message], viewer_uid: &'a str) -> Self {
        Self {
            state,
            messages,
            viewer_uid,
        }
    }
}

impl<'a> Component for MessageList<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        self.state.viewport_height = area.height;

        if self.messages.is_empty() {
            self.state.layout.measure(self.messages, area.width);
            let hint = Paragraph::new("No messages yet. Say hi!")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center);
            let middle = Rect::new(area.x, area.y + area.height / 2, area.width, area.height.min(1));
            frame.render_widget(hint, middle);
            return;
        }

        let content_width = area.width.saturating_sub(1); // -1 for scrollbar safe area

        // 1. Update layout cache
        self.state.layout.measure(self.messages, content_width);
        let total_height = self.state.layout.total_height();

        // 2. Follow the newest message, or clamp after the list shrank
        if self.state.stick_to_bottom {
            let bottom = self.state.max_offset();
            self.state.scroll_state.set_offset(Position { x: 0, y: bottom });
        } else {
            self.state.clamp_scroll();
        }

        let scroll_offset = self.state.scroll_state.offset().y;
        let visible_range = self.state.layout.visible_range(scroll_offset, area.height);

        // 3. Render visible bubbles into a ScrollView
        let mut scroll_view = ScrollView::new(Size::new(content_width, total_height))
            .vertical_scrollbar_visibility(ScrollbarVisibility::Automatic)
            .horizontal_scrollbar_visibility(ScrollbarVisibility::Never);

        let mut y_offset: u16 = if visible_range.start > 0 {
            self.state.layout.prefix_heights[visible_range.start - 1]
        } else {
            0
        };

        for i in visible_range {
            let message = &self.messages[i];
            let height = self.state.layout.heights[i];
            let bubble = MessageBubble::new(message, Ownership::of(message, self.viewer_uid));
            scroll_view.render_widget(bubble, Rect::new(0, y_offset, content_width, height));
            y_offset += height;
        }

        frame.render_stateful_widget(scroll_view, area, &mut self.state.scroll_state);
    }
}

/// EventHandler lives on `MessageListState` because `MessageList` is
/// recreated every frame and cannot hold scroll state.
impl EventHandler for MessageListState {
    type Event = ();

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::ScrollUp => {
                self.scroll_state.scroll_up();
                self.stick_to_bottom = false;
            }
            TuiEvent::ScrollDown => {
                self.scroll_state.scroll_down();
                self.repin_if_at_bottom();
            }
            TuiEvent::ScrollPageUp => {
                self.scroll_state.scroll_page_up();
                self.stick_to_bottom = false;
            }
            TuiEvent::ScrollPageDown => {
                self.scroll_state.scroll_page_down();
                self.repin_if_at_bottom();
            }
            TuiEvent::ScrollToBottom => self.scroll_to_latest(),
            _ => {}
        }
        None
    }
}

/// Bubble heights for the current list, cached per message id.
#[derive(Default)]
pub struct LayoutCache {
    /// Height of each message in list order.
    pub heights: Vec<u16>,
    /// Running sum of `heights`: `prefix_heights[i]` is the bottom edge of item `i`.
    pub prefix_heights: Vec<u16>,
    by_id: HashMap<String, u16>,
    content_width: u16,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recomputes list-order heights, measuring only ids not seen at this width.
    /// Entries for messages that left the window are dropped.
    pub fn measure(&mut self, messages: &[Message], content_width: u16) {
        if self.content_width != content_width {
            self.by_id.clear();
            self.content_width = content_width;
        }

        let current: HashSet<&str> = messages.iter().map(|m| m.id.as_str()).collect();
        self.by_id.retain(|id, _| current.contains(id.as_str()));

        self.heights = messages
            .iter()
            .map(|m| {
                *self
                    .by_id
                    .entry(m.id.clone())
                    .or_insert_with(|| MessageBubble::calculate_height(m, content_width))
            })
            .collect();
        self.rebuild_prefix_heights();
    }

    pub fn cached_len(&self) -> usize {
        self.by_id.len()
    }

    pub fn total_height(&self) -> u16 {
        self.prefix_heights.last().copied().unwrap_or(0)
    }

    fn rebuild_prefix_heights(&mut self) {
        self.prefix_heights = self
            .heights
            .iter()
            .scan(0u16, |acc, &h| {
                *acc = acc.saturating_add(h);
                Some(*acc)
            })
            .collect();
    }

    /// Indices worth rendering for the viewport, with half a screen of slack
    /// on either side.
    pub fn visible_range(&self, scroll_offset: u16, viewport_height: u16) -> std::ops::Range<usize> {
        let buffer = viewport_height / 2;
        let buffered_start = scroll_offset.saturating_sub(buffer);
        let buffered_end = scroll_offset
            .saturating_add(viewport_height)
            .saturating_add(buffer);

        let start = self
            .prefix_heights
            .partition_point(|&end| end <= buffered_start);
        let end = self
            .prefix_heights
            .partition_point(|&end| end < buffered_end)
            .saturating_add(1)
            .min(self.prefix_heights.len());

        start..end
    }
}
