//! # Core Application Logic
//!
//! This module contains chitchat's business logic.
//! It knows nothing about any specific UI technology.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │         CORE            │
//!                    │  (this module)          │
//!                    │                         │
//!                    │  • State (session gate) │
//!                    │  • Action (events)      │
//!                    │  • update() (reducer)   │
//!                    │                         │
//!                    │  No I/O. No UI. Pure.   │
//!                    └───────────┬─────────────┘
//!                                │ Effect
//!                   ┌────────────┴────────────┐
//!                   ▼                         ▼
//!            ┌────────────┐           ┌──────────────┐
//!            │    TUI     │ ────────▶ │   Backends   │
//!            │  Adapter   │           │ (auth/store) │
//!            │ (ratatui)  │           │              │
//!            └────────────┘           └──────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`model`]: Session, Message and the presentation rules derived from them
//! - [`feed`]: The live message window
//! - [`state`]: The `App` struct, all application state in one place
//! - [`action`]: The `Action` enum and the `update()` reducer
//! - [`config`]: Settings resolution

pub mod action;
pub mod config;
pub mod feed;
pub mod model;
pub mod state;
