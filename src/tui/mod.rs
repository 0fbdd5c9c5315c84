//! # TUI Adapter
//!
//! The ratatui-specific layer. Handles terminal I/O, renders the UI,
//! translates keyboard events into core::Action values, and performs the
//! `Effect`s the reducer asks for.
//!
//! This is the only module that knows about ratatui and crossterm.
//!
//! ## Background Work
//!
//! Everything that talks to a backend runs as a tokio task and reports back
//! through a `std::sync::mpsc` channel of `Action`s, drained once per loop
//! iteration:
//!
//! ```text
//! auth watcher ──AuthChanged──────────┐
//! sign-in task ──SignInChallenge/...──┤
//! feed forwarder ──FeedUpdated/...────┼──▶ rx ──▶ update() ──▶ Effect
//! insert task ──InsertSucceeded/...───┘
//! ```
//!
//! The feed subscription is the one long-lived resource. It lives in
//! `Tasks::feed` and is dropped (which cancels it) whenever the feed is
//! unmounted or replaced.
//!
//! ## Redraw Strategy
//!
//! Idle frames are skipped: the loop only redraws after a terminal event or
//! a background action.

mod component;
mod components;
mod event;
mod ui;

use log::{debug, info, warn};
use std::io::stdout;
use std::sync::{Arc, mpsc};
use std::time::Duration;

use crossterm::cursor::{SetCursorStyle, Show};
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
};
use crossterm::execute;
use tokio::task::AbortHandle;

use crate::Backend;
use crate::backend::firebase::credentials;
use crate::backend::{
    DocumentStore, FeedEvent, FirebaseAuth, FirestoreStore, IdentityProvider, MemoryIdentity,
    MemoryStore, Subscription,
};
use crate::core::action::{Action, Effect, update};
use crate::core::config::ResolvedConfig;
use crate::core::feed::FeedQuery;
use crate::core::state::{App, AuthState};
use crate::tui::component::EventHandler;
use crate::tui::components::{ComposeBox, ComposeEvent, MessageListState};
use crate::tui::event::{TuiEvent, poll_event_immediate, poll_event_timeout};

const IDLE_POLL: Duration = Duration::from_millis(250);

/// TUI-specific presentation state (not part of core business logic)
pub struct TuiState {
    pub message_list: MessageListState,
    pub compose: ComposeBox,
}

impl Default for TuiState {
    fn default() -> Self {
        Self::new()
    }
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            message_list: MessageListState::new(),
            compose: ComposeBox::new(),
        }
    }

    /// Fresh presentation state for a newly mounted (or unmounted) feed.
    fn reset_feed(&mut self) {
        self.message_list = MessageListState::new();
        self.compose.clear();
    }
}

/// Handles for background work the loop may need to stop.
#[derive(Default)]
struct Tasks {
    sign_in: Option<AbortHandle>,
    feed: Option<Subscription>,
}

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> std::io::Result<Self> {
        execute!(
            stdout(),
            EnableMouseCapture,
            EnableBracketedPaste,
            Show,
            SetCursorStyle::SteadyBlock, // ratatui resets the blink timer on every draw
        )?;
        info!("Terminal modes enabled (mouse, bracketed paste, steady block cursor)");
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(
            stdout(),
            DisableMouseCapture,
            DisableBracketedPaste,
            SetCursorStyle::DefaultUserShape
        );
    }
}

/// Build the identity provider and message store for the configured backend.
pub fn build_backends(config: &ResolvedConfig) -> (Arc<dyn IdentityProvider>, Arc<dyn DocumentStore>) {
    match config.backend {
        Backend::Memory => {
            info!("Using in-memory backend as {}", config.memory_profile.uid);
            let identity: Arc<dyn IdentityProvider> =
                Arc::new(MemoryIdentity::new(config.memory_profile.clone()));
            let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
            (identity, store)
        }
        Backend::Firebase => {
            if let Err(e) = config.firebase.validate() {
                // Still start: the viewer sees the sign-in prompt, and the
                // attempt fails with this error in the log
                warn!("{}", e);
            }
            let auth = Arc::new(FirebaseAuth::new(
                config.firebase.clone(),
                credentials::default_path(),
            ));
            let store: Arc<dyn DocumentStore> =
                Arc::new(FirestoreStore::new(config.firebase.clone(), auth.clone()));
            let identity: Arc<dyn IdentityProvider> = auth;
            (identity, store)
        }
    }
}

pub fn run(config: ResolvedConfig) -> std::io::Result<()> {
    let (identity, store) = build_backends(&config);
    let mut app = App::new(identity, store);
    let mut tui = TuiState::new();
    let mut tasks = Tasks::default();

    let mut terminal = ratatui::init();
    let _terminal_mode_guard = TerminalModeGuard::new();

    // Channel for actions from background tasks
    let (tx, rx) = mpsc::channel();

    spawn_auth_watcher(app.identity.clone(), tx.clone());
    spawn_resolve(app.identity.clone());

    let mut needs_redraw = true; // Force first frame

    'main: loop {
        if needs_redraw {
            terminal.draw(|f| ui::draw_ui(f, &app, &mut tui))?;
            needs_redraw = false;
        }

        let first_event = poll_event_timeout(IDLE_POLL);
        if first_event.is_some() {
            needs_redraw = true;
        }

        // Process first event + drain ALL pending events before next draw
        for event in first_event
            .into_iter()
            .chain(std::iter::from_fn(poll_event_immediate))
        {
            let Some(action) = route_event(&app, &mut tui, &event) else {
                continue;
            };
            let effect = update(&mut app, action);
            if perform(effect, &app, &mut tui, &mut tasks, &tx) {
                break 'main;
            }
        }

        // Handle background task actions
        while let Ok(action) = rx.try_recv() {
            needs_redraw = true;
            debug!("Event loop received: {:?}", action);
            let effect = update(&mut app, action);
            if perform(effect, &app, &mut tui, &mut tasks, &tx) {
                break 'main;
            }
        }
    }

    // Dropping the subscription stops the live query
    tasks.feed = None;
    if let Some(handle) = tasks.sign_in.take() {
        handle.abort();
    }

    ratatui::restore();
    info!("chitchat shutting down");
    Ok(())
}

/// Translate a terminal event into a core action, given which screen the
/// session gate is showing. Presentation-only events are handled in place.
fn route_event(app: &App, tui: &mut TuiState, event: &TuiEvent) -> Option<Action> {
    match event {
        TuiEvent::ForceQuit => return Some(Action::Quit),
        TuiEvent::SignOut => return Some(Action::SignOut),
        TuiEvent::Resize => return None,
        _ => {}
    }

    match app.auth {
        AuthState::Unresolved => None,
        AuthState::Anonymous => match event {
            TuiEvent::Submit => Some(Action::SignInRequested),
            TuiEvent::Escape => Some(Action::SignInCancelled),
            _ => None,
        },
        AuthState::Authenticated(_) => {
            if matches!(
                event,
                TuiEvent::ScrollUp
                    | TuiEvent::ScrollDown
                    | TuiEvent::ScrollPageUp
                    | TuiEvent::ScrollPageDown
                    | TuiEvent::ScrollToBottom
            ) {
                tui.message_list.handle_event(event);
                return None;
            }

            tui.compose.can_send = app.feed.as_ref().is_some_and(|f| f.can_submit());
            match tui.compose.handle_event(event)? {
                ComposeEvent::Changed(text) => Some(Action::EditDraft(text)),
                ComposeEvent::Submit => Some(Action::Submit),
            }
        }
    }
}

/// Carry out an effect. Returns true when the app should quit.
fn perform(
    effect: Effect,
    app: &App,
    tui: &mut TuiState,
    tasks: &mut Tasks,
    tx: &mpsc::Sender<Action>,
) -> bool {
    match effect {
        Effect::None => {}
        Effect::Quit => return true,
        Effect::StartSignIn => {
            tasks.sign_in = Some(spawn_sign_in(app.identity.clone(), tx.clone()));
        }
        Effect::CancelSignIn => {
            if let Some(handle) = tasks.sign_in.take() {
                handle.abort();
            }
        }
        Effect::SignOut => spawn_sign_out(app.identity.clone()),
        Effect::MountFeed(subscription) => {
            tasks.sign_in = None;
            tui.reset_feed();
            // Replacing the handle drops (and cancels) the previous query
            tasks.feed = Some(mount_feed(app.store.as_ref(), subscription, tx.clone()));
        }
        Effect::UnmountFeed => {
            tasks.feed = None;
            tui.reset_feed();
        }
        Effect::Insert {
            subscription,
            message,
        } => spawn_insert(app.store.clone(), subscription, message, tx.clone()),
        Effect::ClearDraft => {
            tui.compose.clear();
            tui.message_list.scroll_to_latest();
        }
        Effect::ScrollToLatest => tui.message_list.scroll_to_latest(),
    }
    false
}

fn send(tx: &mpsc::Sender<Action>, action: Action) -> bool {
    if tx.send(action).is_err() {
        warn!("Failed to send action: receiver dropped");
        return false;
    }
    true
}

fn spawn_auth_watcher(identity: Arc<dyn IdentityProvider>, tx: mpsc::Sender<Action>) {
    let mut state = identity.watch();
    tokio::spawn(async move {
        loop {
            let current = state.borrow_and_update().clone();
            if !send(&tx, Action::AuthChanged(current)) {
                return;
            }
            if state.changed().await.is_err() {
                debug!("Identity provider dropped, auth watcher ending");
                return;
            }
        }
    });
}

fn spawn_resolve(identity: Arc<dyn IdentityProvider>) {
    tokio::spawn(async move {
        if let Err(e) = identity.resolve().await {
            warn!("Could not resolve initial session: {}", e);
        }
    });
}

fn spawn_sign_in(identity: Arc<dyn IdentityProvider>, tx: mpsc::Sender<Action>) -> AbortHandle {
    info!("Starting sign-in with {}", identity.name());
    let task = tokio::spawn(async move {
        let (challenge_tx, mut challenge_rx) = tokio::sync::mpsc::unbounded_channel();
        let sign_in = identity.sign_in(challenge_tx);
        tokio::pin!(sign_in);

        loop {
            tokio::select! {
                Some(challenge) = challenge_rx.recv() => {
                    send(&tx, Action::SignInChallenge(challenge));
                }
                result = &mut sign_in => {
                    match result {
                        // The auth watcher reports the new session
                        Ok(session) => info!("Signed in as {}", session.uid),
                        Err(e) => {
                            send(&tx, Action::SignInFailed(e.to_string()));
                        }
                    }
                    return;
                }
            }
        }
    });
    task.abort_handle()
}

fn spawn_sign_out(identity: Arc<dyn IdentityProvider>) {
    tokio::spawn(async move {
        match identity.sign_out().await {
            Ok(()) => info!("Signed out"),
            Err(e) => warn!("Sign-out failed: {}", e),
        }
    });
}

/// Start the live query and a forwarder that tags every event with the
/// subscription id. The forwarder's lifetime is tied to the returned handle.
fn mount_feed(store: &dyn DocumentStore, subscription: u64, tx: mpsc::Sender<Action>) -> Subscription {
    info!("Mounting feed {} on {}", subscription, store.name());
    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel();
    let mut handle = store.subscribe(FeedQuery::latest(), event_tx);

    let forwarder = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let action = match event {
                FeedEvent::Snapshot(messages) => Action::FeedUpdated {
                    subscription,
                    messages,
                },
                FeedEvent::Failed(e) => Action::FeedFailed {
                    subscription,
                    error: e.to_string(),
                },
            };
            if !send(&tx, action) {
                return;
            }
        }
        debug!("Feed {} closed", subscription);
    });
    handle.attach(forwarder.abort_handle());
    handle
}

fn spawn_insert(
    store: Arc<dyn DocumentStore>,
    subscription: u64,
    message: crate::core::model::NewMessage,
    tx: mpsc::Sender<Action>,
) {
    tokio::spawn(async move {
        let action = match store.insert(message).await {
            Ok(id) => Action::InsertSucceeded { subscription, id },
            Err(e) => Action::InsertFailed {
                subscription,
                error: e.to_string(),
            },
        };
        send(&tx, action);
    });
}
