//! Frame layout: title bar on top, then whatever the session gate selects.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};

use crate::core::state::{App, AuthState};
use crate::tui::TuiState;
use crate::tui::component::Component;
use crate::tui::components::{
    COMPOSE_HEIGHT, Connecting, MessageList, SignInPrompt, TitleBar,
};

pub fn draw_ui(frame: &mut Frame, app: &App, tui: &mut TuiState) {
    use Constraint::{Length, Min};
    let [title_area, main_area] = Layout::vertical([Length(1), Min(0)]).areas(frame.area());

    TitleBar::new(
        app.session().map(|s| s.display_name.clone()),
        app.status_message.clone(),
    )
    .render(frame, title_area);

    match &app.auth {
        AuthState::Unresolved => Connecting.render(frame, main_area),
        AuthState::Anonymous => {
            SignInPrompt::new(&app.sign_in, app.identity.name()).render(frame, main_area)
        }
        AuthState::Authenticated(session) => draw_chat(frame, main_area, app, tui, &session.uid),
    }
}

fn draw_chat(frame: &mut Frame, area: Rect, app: &App, tui: &mut TuiState, viewer_uid: &str) {
    use Constraint::{Length, Min};
    let [list_area, compose_area] = Layout::vertical([Min(0), Length(COMPOSE_HEIGHT)]).areas(area);

    let messages = app.feed.as_ref().map(|f| f.messages.as_slice()).unwrap_or(&[]);
    MessageList::new(&mut tui.message_list, messages, viewer_uid).render(frame, list_area);

    tui.compose.can_send = app.feed.as_ref().is_some_and(|f| f.can_submit());
    tui.compose.render(frame, compose_area);
}
