//! # Actions
//!
//! Everything that can happen in chitchat becomes an `Action`.
//! User presses Enter? That's `Action::Submit`.
//! The store pushes a new snapshot? That's `Action::FeedUpdated { .. }`.
//!
//! The `update()` function takes the current state and an action, mutates
//! the state, and returns an `Effect` describing the I/O the TUI should
//! perform. No side effects here. I/O happens elsewhere.
//!
//! ```text
//! State + Action  →  update()  →  New State + Effect
//! ```

use log::{debug, info, warn};

use crate::backend::SignInChallenge;
use crate::core::feed::{FEED_WINDOW, window};
use crate::core::model::{Message, NewMessage};
use crate::core::state::{App, AuthState, SignInStatus};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Quit,
    /// The identity provider reported a new auth state.
    AuthChanged(AuthState),
    /// Viewer asked to sign in.
    SignInRequested,
    /// Provider wants the viewer to confirm on another device.
    SignInChallenge(SignInChallenge),
    /// Sign-in flow ended without a session.
    SignInFailed(String),
    /// Viewer abandoned the sign-in flow.
    SignInCancelled,
    SignOut,
    /// A live query delivered a new result set.
    FeedUpdated {
        subscription: u64,
        messages: Vec<Message>,
    },
    /// A live query failed and stopped.
    FeedFailed { subscription: u64, error: String },
    /// Draft text changed (every keystroke).
    EditDraft(String),
    Submit,
    /// The store acknowledged a write sent from feed `subscription`.
    InsertSucceeded { subscription: u64, id: String },
    InsertFailed { subscription: u64, error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    Quit,
    /// Launch the provider's interactive sign-in.
    StartSignIn,
    /// Stop the running sign-in flow.
    CancelSignIn,
    SignOut,
    /// Replace any current subscription with a new one tagged with this id.
    MountFeed(u64),
    /// Release the feed subscription.
    UnmountFeed,
    /// Write a message on behalf of the feed mounted as `subscription`.
    Insert {
        subscription: u64,
        message: NewMessage,
    },
    /// Clear the compose box and bring the latest message into view.
    ClearDraft,
    /// Bring the latest message into view.
    ScrollToLatest,
}

pub fn update(app: &mut App, action: Action) -> Effect {
    match action {
        Action::Quit => Effect::Quit,
        Action::AuthChanged(next) => apply_auth(app, next),
        Action::SignInRequested => {
            if app.auth != AuthState::Anonymous || app.sign_in != SignInStatus::Idle {
                return Effect::None;
            }
            app.sign_in = SignInStatus::Pending;
            Effect::StartSignIn
        }
        Action::SignInChallenge(challenge) => {
            if app.sign_in == SignInStatus::Idle {
                // Flow was cancelled before the provider got back to us
                return Effect::None;
            }
            app.sign_in = SignInStatus::AwaitingUser(challenge);
            Effect::None
        }
        Action::SignInFailed(reason) => {
            // Provider UI owns failure feedback; the prompt just goes back to idle
            warn!("Sign-in did not complete: {}", reason);
            app.sign_in = SignInStatus::Idle;
            Effect::None
        }
        Action::SignInCancelled => {
            if app.sign_in == SignInStatus::Idle {
                return Effect::None;
            }
            info!("Sign-in cancelled by viewer");
            app.sign_in = SignInStatus::Idle;
            Effect::CancelSignIn
        }
        Action::SignOut => {
            if app.session().is_none() {
                return Effect::None;
            }
            Effect::SignOut
        }
        Action::FeedUpdated {
            subscription,
            messages,
        } => {
            let Some(feed) = app.feed.as_mut().filter(|f| f.subscription == subscription) else {
                debug!("Dropping snapshot from stale subscription {}", subscription);
                return Effect::None;
            };
            feed.messages = window(messages, FEED_WINDOW);
            debug!(
                "Feed {} now shows {} messages",
                subscription,
                feed.messages.len()
            );
            Effect::ScrollToLatest
        }
        Action::FeedFailed {
            subscription,
            error,
        } => {
            if app.feed.as_ref().is_none_or(|f| f.subscription != subscription) {
                return Effect::None;
            }
            // Leave whatever is on screen in place
            warn!("Live feed {} stopped: {}", subscription, error);
            app.status_message = format!("Feed unavailable: {error}");
            Effect::None
        }
        Action::EditDraft(text) => {
            if let Some(feed) = app.feed.as_mut() {
                feed.draft = text;
            }
            Effect::None
        }
        Action::Submit => {
            let (Some(session), Some(feed)) = (app.auth.session(), app.feed.as_ref()) else {
                return Effect::None;
            };
            if !feed.can_submit() {
                return Effect::None;
            }
            Effect::Insert {
                subscription: feed.subscription,
                message: NewMessage::from_session(session, feed.draft.clone()),
            }
        }
        Action::InsertSucceeded { subscription, id } => {
            debug!("Insert acknowledged: {}", id);
            let Some(feed) = app.feed.as_mut().filter(|f| f.subscription == subscription) else {
                // The feed that sent it is gone; its draft went with it
                return Effect::None;
            };
            feed.draft.clear();
            Effect::ClearDraft
        }
        Action::InsertFailed {
            subscription,
            error,
        } => {
            warn!("Message not sent: {}", error);
            if app.feed.as_ref().is_none_or(|f| f.subscription != subscription) {
                return Effect::None;
            }
            // Draft stays so the viewer can try again
            app.status_message = format!("Send failed: {error}");
            Effect::None
        }
    }
}

/// Session gate transition. The rendered child is replaced wholesale:
/// a new session mounts a new feed, losing the session unmounts it.
fn apply_auth(app: &mut App, next: AuthState) -> Effect {
    if app.auth == next {
        return Effect::None;
    }
    info!("Auth state: {} -> {}", gate_label(&app.auth), gate_label(&next));

    let previous_uid = app.auth.session().map(|s| s.uid.clone());
    app.auth = next;
    app.status_message.clear();

    let current_uid = app.auth.session().map(|s| s.uid.clone());

    match (previous_uid, current_uid) {
        // Same account with a refreshed profile: the feed stays mounted
        (Some(prev), Some(uid)) if prev == uid && app.feed.is_some() => Effect::None,
        (_, Some(_)) => {
            app.sign_in = SignInStatus::Idle;
            Effect::MountFeed(app.mount_feed())
        }
        (Some(_), None) => {
            app.feed = None;
            Effect::UnmountFeed
        }
        (None, None) => Effect::None,
    }
}

fn gate_label(state: &AuthState) -> &'static str {
    match state {
        AuthState::Unresolved => "unresolved",
        AuthState::Anonymous => "anonymous",
        AuthState::Authenticated(_) => "authenticated",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Session;
    use crate::test_support::{message, session, signed_in_app, test_app};

    fn anonymous_app() -> App {
        let mut app = test_app();
        update(&mut app, Action::AuthChanged(AuthState::Anonymous));
        app
    }

    fn current_subscription(app: &App) -> u64 {
        app.feed.as_ref().map(|f| f.subscription).unwrap_or_default()
    }

    // ==========================================================================
    // Session gate
    // ==========================================================================

    #[test]
    fn resolving_to_anonymous_mounts_nothing() {
        let mut app = test_app();
        let effect = update(&mut app, Action::AuthChanged(AuthState::Anonymous));
        assert_eq!(effect, Effect::None);
        assert!(app.feed.is_none());
    }

    #[test]
    fn signing_in_mounts_a_feed() {
        let mut app = anonymous_app();
        let effect = update(&mut app, Action::AuthChanged(AuthState::Authenticated(session())));
        let id = current_subscription(&app);
        assert_eq!(effect, Effect::MountFeed(id));
        assert!(app.feed.as_ref().is_some_and(|f| f.messages.is_empty()));
    }

    #[test]
    fn signing_out_unmounts_the_feed() {
        let mut app = signed_in_app();
        let effect = update(&mut app, Action::AuthChanged(AuthState::Anonymous));
        assert_eq!(effect, Effect::UnmountFeed);
        assert!(app.feed.is_none());
    }

    #[test]
    fn switching_accounts_remounts_with_new_id() {
        let mut app = signed_in_app();
        let before = current_subscription(&app);
        let bob = Session {
            display_name: "Bob".into(),
            uid: "u2".into(),
            photo_url: None,
        };
        let effect = update(&mut app, Action::AuthChanged(AuthState::Authenticated(bob)));
        let after = current_subscription(&app);
        assert_ne!(before, after);
        assert_eq!(effect, Effect::MountFeed(after));
    }

    #[test]
    fn profile_refresh_keeps_the_feed() {
        let mut app = signed_in_app();
        let before = current_subscription(&app);
        let mut renamed = session();
        renamed.display_name = "Alice B.".into();
        let effect = update(&mut app, Action::AuthChanged(AuthState::Authenticated(renamed)));
        assert_eq!(effect, Effect::None);
        assert_eq!(current_subscription(&app), before);
    }

    #[test]
    fn repeated_auth_state_is_ignored() {
        let mut app = anonymous_app();
        assert_eq!(update(&mut app, Action::AuthChanged(AuthState::Anonymous)), Effect::None);
    }

    #[test]
    fn gate_cycles_indefinitely() {
        let mut app = anonymous_app();
        for _ in 0..3 {
            let effect = update(&mut app, Action::AuthChanged(AuthState::Authenticated(session())));
            assert!(matches!(effect, Effect::MountFeed(_)));
            let effect = update(&mut app, Action::AuthChanged(AuthState::Anonymous));
            assert_eq!(effect, Effect::UnmountFeed);
        }
    }

    // ==========================================================================
    // Sign-in prompt
    // ==========================================================================

    #[test]
    fn sign_in_starts_only_when_anonymous_and_idle() {
        let mut app = test_app();
        assert_eq!(update(&mut app, Action::SignInRequested), Effect::None);

        let mut app = anonymous_app();
        assert_eq!(update(&mut app, Action::SignInRequested), Effect::StartSignIn);
        assert_eq!(app.sign_in, SignInStatus::Pending);
        // Second press while pending does nothing
        assert_eq!(update(&mut app, Action::SignInRequested), Effect::None);
    }

    #[test]
    fn failed_sign_in_returns_to_idle_silently() {
        let mut app = anonymous_app();
        update(&mut app, Action::SignInRequested);
        let effect = update(&mut app, Action::SignInFailed("access_denied".into()));
        assert_eq!(effect, Effect::None);
        assert_eq!(app.sign_in, SignInStatus::Idle);
        assert_eq!(app.auth, AuthState::Anonymous);
        assert!(app.status_message.is_empty());
    }

    #[test]
    fn challenge_after_cancel_is_dropped() {
        let mut app = anonymous_app();
        update(&mut app, Action::SignInRequested);
        assert_eq!(update(&mut app, Action::SignInCancelled), Effect::CancelSignIn);
        let challenge = SignInChallenge {
            verification_url: "https://www.google.com/device".into(),
            user_code: "ABCD-EFGH".into(),
            expires_in: 1800,
        };
        update(&mut app, Action::SignInChallenge(challenge));
        assert_eq!(app.sign_in, SignInStatus::Idle);
    }

    #[test]
    fn successful_sign_in_clears_prompt_state() {
        let mut app = anonymous_app();
        update(&mut app, Action::SignInRequested);
        update(&mut app, Action::AuthChanged(AuthState::Authenticated(session())));
        assert_eq!(app.sign_in, SignInStatus::Idle);
    }

    #[test]
    fn sign_out_requires_a_session() {
        let mut app = anonymous_app();
        assert_eq!(update(&mut app, Action::SignOut), Effect::None);
        let mut app = signed_in_app();
        assert_eq!(update(&mut app, Action::SignOut), Effect::SignOut);
    }

    // ==========================================================================
    // Feed
    // ==========================================================================

    #[test]
    fn snapshot_replaces_list_wholesale() {
        let mut app = signed_in_app();
        let id = current_subscription(&app);
        update(
            &mut app,
            Action::FeedUpdated {
                subscription: id,
                messages: vec![message("a", "u1", 1), message("b", "u2", 2)],
            },
        );
        let effect = update(
            &mut app,
            Action::FeedUpdated {
                subscription: id,
                messages: vec![message("c", "u2", 3)],
            },
        );
        assert_eq!(effect, Effect::ScrollToLatest);
        let ids: Vec<_> = app.feed.as_ref().map(|f| f.messages.iter().map(|m| m.id.clone()).collect()).unwrap_or_default();
        assert_eq!(ids, vec!["c"]);
    }

    #[test]
    fn snapshot_is_ordered_and_bounded() {
        let mut app = signed_in_app();
        let id = current_subscription(&app);
        let messages: Vec<_> = (0..30).rev().map(|i| message(&format!("m{i:02}"), "u1", i)).collect();
        update(&mut app, Action::FeedUpdated { subscription: id, messages });
        let feed = app.feed.as_ref().map(|f| &f.messages[..]).unwrap_or_default();
        assert_eq!(feed.len(), 25);
        assert!(feed.windows(2).all(|w| w[0].created_at <= w[1].created_at));
        assert_eq!(feed.last().map(|m| m.id.as_str()), Some("m29"));
    }

    #[test]
    fn stale_snapshot_after_unmount_is_ignored() {
        let mut app = signed_in_app();
        let old = current_subscription(&app);
        update(&mut app, Action::AuthChanged(AuthState::Anonymous));
        let effect = update(
            &mut app,
            Action::FeedUpdated {
                subscription: old,
                messages: vec![message("late", "u1", 9)],
            },
        );
        assert_eq!(effect, Effect::None);
        assert!(app.feed.is_none());

        let effect = update(
            &mut app,
            Action::FeedFailed {
                subscription: old,
                error: "gone".into(),
            },
        );
        assert_eq!(effect, Effect::None);
        assert!(app.status_message.is_empty());
    }

    #[test]
    fn stale_snapshot_from_previous_mount_is_ignored() {
        let mut app = signed_in_app();
        let old = current_subscription(&app);
        update(&mut app, Action::AuthChanged(AuthState::Anonymous));
        update(&mut app, Action::AuthChanged(AuthState::Authenticated(session())));
        update(
            &mut app,
            Action::FeedUpdated {
                subscription: old,
                messages: vec![message("late", "u1", 9)],
            },
        );
        assert!(app.feed.as_ref().is_some_and(|f| f.messages.is_empty()));
    }

    #[test]
    fn feed_failure_keeps_stale_list() {
        let mut app = signed_in_app();
        let id = current_subscription(&app);
        update(
            &mut app,
            Action::FeedUpdated {
                subscription: id,
                messages: vec![message("a", "u1", 1)],
            },
        );
        update(
            &mut app,
            Action::FeedFailed {
                subscription: id,
                error: "permission denied".into(),
            },
        );
        assert_eq!(app.feed.as_ref().map(|f| f.messages.len()), Some(1));
        assert!(app.status_message.contains("permission denied"));
    }

    // ==========================================================================
    // Compose & submit
    // ==========================================================================

    #[test]
    fn empty_draft_submit_has_no_effect() {
        let mut app = signed_in_app();
        assert_eq!(update(&mut app, Action::Submit), Effect::None);
        update(&mut app, Action::EditDraft("x".into()));
        update(&mut app, Action::EditDraft(String::new()));
        assert_eq!(update(&mut app, Action::Submit), Effect::None);
    }

    #[test]
    fn submit_builds_message_from_session_and_draft() {
        let mut app = signed_in_app();
        update(&mut app, Action::EditDraft("hi".into()));
        let effect = update(&mut app, Action::Submit);
        assert_eq!(
            effect,
            Effect::Insert {
                subscription: current_subscription(&app),
                message: NewMessage {
                    user: "Alice".into(),
                    uid: "u1".into(),
                    photo_url: None,
                    body: "hi".into(),
                },
            }
        );
        // Draft is only cleared once the store acknowledges
        assert_eq!(app.feed.as_ref().map(|f| f.draft.as_str()), Some("hi"));
    }

    #[test]
    fn acknowledged_insert_clears_draft() {
        let mut app = signed_in_app();
        update(&mut app, Action::EditDraft("hi".into()));
        update(&mut app, Action::Submit);
        let subscription = current_subscription(&app);
        let effect = update(
            &mut app,
            Action::InsertSucceeded {
                subscription,
                id: "m1".into(),
            },
        );
        assert_eq!(effect, Effect::ClearDraft);
        assert_eq!(app.feed.as_ref().map(|f| f.draft.as_str()), Some(""));
    }

    #[test]
    fn failed_insert_keeps_draft() {
        let mut app = signed_in_app();
        update(&mut app, Action::EditDraft("hi".into()));
        update(&mut app, Action::Submit);
        let subscription = current_subscription(&app);
        let effect = update(
            &mut app,
            Action::InsertFailed {
                subscription,
                error: "HTTP 403".into(),
            },
        );
        assert_eq!(effect, Effect::None);
        assert_eq!(app.feed.as_ref().map(|f| f.draft.as_str()), Some("hi"));
        assert!(app.status_message.contains("HTTP 403"));
    }

    #[test]
    fn late_insert_outcome_does_not_touch_the_next_account() {
        let mut app = signed_in_app();
        update(&mut app, Action::EditDraft("alice msg".into()));
        let Effect::Insert { subscription: sent_from, .. } = update(&mut app, Action::Submit) else {
            panic!("expected insert");
        };

        update(&mut app, Action::AuthChanged(AuthState::Anonymous));
        let bob = Session {
            display_name: "Bob".into(),
            uid: "u2".into(),
            photo_url: None,
        };
        update(&mut app, Action::AuthChanged(AuthState::Authenticated(bob)));
        update(&mut app, Action::EditDraft("bob draft".into()));

        let effect = update(
            &mut app,
            Action::InsertSucceeded {
                subscription: sent_from,
                id: "m1".into(),
            },
        );
        assert_eq!(effect, Effect::None);
        assert_eq!(app.feed.as_ref().map(|f| f.draft.as_str()), Some("bob draft"));

        let effect = update(
            &mut app,
            Action::InsertFailed {
                subscription: sent_from,
                error: "HTTP 403".into(),
            },
        );
        assert_eq!(effect, Effect::None);
        assert!(app.status_message.is_empty());
    }

    #[test]
    fn rapid_submits_are_not_debounced() {
        let mut app = signed_in_app();
        update(&mut app, Action::EditDraft("hi".into()));
        assert!(matches!(update(&mut app, Action::Submit), Effect::Insert { .. }));
        assert!(matches!(update(&mut app, Action::Submit), Effect::Insert { .. }));
    }

    #[test]
    fn submit_without_session_does_nothing() {
        let mut app = anonymous_app();
        update(&mut app, Action::EditDraft("hi".into()));
        assert_eq!(update(&mut app, Action::Submit), Effect::None);
    }
}
