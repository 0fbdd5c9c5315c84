//! # Backends
//!
//! chitchat owns no persistence and no authentication. Both come from
//! outside, behind two capabilities:
//!
//! - [`IdentityProvider`]: who is signed in, sign-in, sign-out.
//! - [`DocumentStore`]: live query over the message feed, insert.
//!
//! Components receive these as `Arc<dyn ..>` at construction, never as
//! globals, so tests can swap in the in-memory pair.

pub mod firebase;
pub mod memory;
pub mod provider;

pub use firebase::{FirebaseAuth, FirestoreStore};
pub use memory::{MemoryIdentity, MemoryStore};
pub use provider::{
    BackendError, DocumentStore, FeedEvent, IdentityProvider, SignInChallenge, Subscription,
    deliver,
};
