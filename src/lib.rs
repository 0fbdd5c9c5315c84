//! chitchat library exports for testing

use clap::ValueEnum;

pub mod backend;
pub mod core;
pub mod tui;

#[cfg(test)]
pub mod test_support;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Firebase Authentication + Cloud Firestore
    #[default]
    Firebase,
    /// In-process identity and store (offline)
    Memory,
}
