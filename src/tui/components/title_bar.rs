//! # TitleBar Component
//!
//! Top status line: app name, who is signed in, the current status message,
//! and the sign-out hint.
//!
//! The sign-out hint is the terminal counterpart of a sign-out button, so it
//! is only rendered while a session exists. Everything comes in as props:
//!
//! ```rust,ignore
//! let mut title_bar = TitleBar::new(
//!     app.session().map(|s| s.display_name.clone()),
//!     app.status_message.clone(),
//! );
//! title_bar.render(frame, title_area);
//! ```

use crate::tui::component::Component;
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

pub const SIGN_OUT_HINT: &str = "Ctrl+X sign out";

/// Top status bar component.
///
/// # Props
///
/// - `signed_in_as`: display name of the viewer, `None` when signed out
/// - `status_message`: transient status ("Send failed: ...", "Feed unavailable: ...")
pub struct TitleBar {
    pub signed_in_as: Option<String>,
    pub status_message: String,
}

impl TitleBar {
    pub fn new(signed_in_as: Option<String>, status_message: String) -> Self {
        Self {
            signed_in_as,
            status_message,
        }
    }

    fn left_text(&self) -> String {
        let mut text = String::from("chitchat");
        if let Some(name) = &self.signed_in_as {
            text.push_str(&format!(" ({name})"));
        }
        if !self.status_message.is_empty() {
            text.push_str(&format!(" | {}", self.status_message));
        }
        text
    }
}

impl Component for TitleBar {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let left = Span::styled(self.left_text(), Style::default().add_modifier(Modifier::BOLD));

        if self.signed_in_as.is_none() {
            frame.render_widget(left, area);
            return;
        }

        let hint_width = SIGN_OUT_HINT.len() as u16;
        let [left_area, hint_area] =
            Layout::horizontal([Constraint::Min(0), Constraint::Length(hint_width)]).areas(area);
        frame.render_widget(left, left_area);
        frame.render_widget(
            Line::from(Span::styled(SIGN_OUT_HINT, Style::default().fg(Color::DarkGray))),
            hint_area,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn render_text(title_bar: &mut TitleBar) -> String {
        let backend = TestBackend::new(80, 1);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| {
                title_bar.render(f, f.area());
            })
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect::<String>()
    }

    #[test]
    fn test_sign_out_hint_only_when_signed_in() {
        let text = render_text(&mut TitleBar::new(Some("Alice".into()), String::new()));
        assert!(text.contains("chitchat (Alice)"));
        assert!(text.contains(SIGN_OUT_HINT));

        let text = render_text(&mut TitleBar::new(None, String::new()));
        assert!(text.contains("chitchat"));
        assert!(!text.contains(SIGN_OUT_HINT));
    }

    #[test]
    fn test_status_message_is_shown() {
        let text = render_text(&mut TitleBar::new(
            Some("Alice".into()),
            "Send failed: network error".into(),
        ));
        assert!(text.contains("| Send failed: network error"));
    }

    #[test]
    fn test_no_separator_without_status() {
        let title_bar = TitleBar::new(None, String::new());
        assert_eq!(title_bar.left_text(), "chitchat");
    }
}
