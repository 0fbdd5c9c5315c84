//! # TUI Components
//!
//! This module contains all UI components for the terminal interface.
//!
//! ## Component Architecture
//!
//! Components follow two patterns:
//!
//! ### Stateless Components (Props-Based Rendering)
//!
//! Display components that receive all data as props:
//! - `TitleBar`: top line with the viewer's name, status and sign-out hint
//! - `SignInPrompt` / `Connecting`: the screens shown before a session exists
//! - `MessageBubble`: one chat message
//!
//! ### Stateful Components (Event-Driven)
//!
//! Components that manage local state and emit events:
//! - `ComposeBox`: draft editor with the send control
//! - `MessageList`: scrollable feed with per-message layout caching
//!
//! Components receive external data as props, never by reaching into the
//! global `App`:
//!
//! ```rust,ignore
//! // Dependencies are explicit
//! MessageList::new(&mut tui.message_list, &feed.messages, &session.uid).render(frame, area);
//! ```
//!
//! ## Module Structure
//!
//! ```text
//! components/
//! ├── mod.rs           (this file)
//! ├── title_bar.rs     (Top status bar)
//! ├── sign_in.rs       (Sign-in prompt and connecting placeholder)
//! ├── message.rs       (Single message bubble)
//! ├── message_list.rs  (Scrollable feed)
//! └── compose_box.rs   (Draft editor)
//! ```

pub mod compose_box;
pub mod message;
pub mod message_list;
pub mod sign_in;
mod title_bar;

pub use compose_box::{COMPOSE_HEIGHT, ComposeBox, ComposeEvent};
pub use message::MessageBubble;
pub use message_list::{MessageList, MessageListState};
pub use sign_in::{Connecting, SignInPrompt};
pub use title_bar::TitleBar;
