//! # SignInPrompt Component
//!
//! Full-screen prompt shown to anonymous viewers. Enter starts the
//! provider's sign-in flow. While the flow waits for the viewer, the
//! verification address and code are shown here; Esc abandons the flow.

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};

use crate::core::state::SignInStatus;
use crate::tui::component::Component;

pub struct SignInPrompt<'a> {
    pub status: &'a SignInStatus,
    /// Identity provider name, e.g. "firebase".
    pub provider: &'a str,
}

impl<'a> SignInPrompt<'a> {
    pub fn new(status: &'a SignInStatus, provider: &'a str) -> Self {
        Self { status, provider }
    }

    fn lines(&self) -> Vec<Line<'a>> {
        let dim = Style::default().fg(Color::DarkGray);
        let strong = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);

        let mut lines = vec![
            Line::from(Span::styled(
                "chitchat",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::default(),
        ];

        match self.status {
            SignInStatus::Idle => {
                lines.push(Line::from(vec![
                    Span::raw("Press "),
                    Span::styled("Enter", strong),
                    Span::raw(" to sign in"),
                ]));
                lines.push(Line::from(Span::styled(format!("via {}", self.provider), dim)));
            }
            SignInStatus::Pending => {
                lines.push(Line::from("Starting sign-in..."));
                lines.push(Line::from(Span::styled("Esc to cancel", dim)));
            }
            SignInStatus::AwaitingUser(challenge) => {
                lines.push(Line::from(vec![
                    Span::raw("Open "),
                    Span::styled(challenge.verification_url.clone(), strong),
                ]));
                lines.push(Line::from(vec![
                    Span::raw("and enter the code "),
                    Span::styled(challenge.user_code.clone(), strong),
                ]));
                lines.push(Line::default());
                lines.push(Line::from(Span::styled(
                    format!(
                        "Code expires in {} min. Esc to cancel",
                        challenge.expires_in.div_ceil(60)
                    ),
                    dim,
                )));
            }
        }
        lines
    }
}

impl<'a> Component for SignInPrompt<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let lines = self.lines();
        let [middle] = Layout::vertical([Constraint::Length(lines.len() as u16)])
            .flex(Flex::Center)
            .areas(area);
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, middle);
    }
}

/// Neutral screen shown until the identity provider reports for the first time.
pub struct Connecting;

impl Component for Connecting {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let [middle] = Layout::vertical([Constraint::Length(1)])
            .flex(Flex::Center)
            .areas(area);
        frame.render_widget(
            Paragraph::new(Span::styled("Connecting...", Style::default().fg(Color::DarkGray)))
                .alignment(Alignment::Center),
            middle,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SignInChallenge;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn screen(component: &mut impl Component) -> String {
        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        terminal.draw(|f| component.render(f, f.area())).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn idle_prompt_invites_sign_in() {
        let status = SignInStatus::Idle;
        let text = screen(&mut SignInPrompt::new(&status, "firebase"));
        assert!(text.contains("Press Enter to sign in"));
        assert!(text.contains("via firebase"));
    }

    #[test]
    fn challenge_is_displayed() {
        let status = SignInStatus::AwaitingUser(SignInChallenge {
            verification_url: "https://www.google.com/device".into(),
            user_code: "WXYZ-1234".into(),
            expires_in: 1800,
        });
        let text = screen(&mut SignInPrompt::new(&status, "firebase"));
        assert!(text.contains("https://www.google.com/device"));
        assert!(text.contains("WXYZ-1234"));
        assert!(text.contains("30 min"));
    }

    #[test]
    fn connecting_placeholder() {
        assert!(screen(&mut Connecting).contains("Connecting..."));
    }
}
