//! Persisted session state.
//!
//! This module provides:
//! - `SessionStore`: the storage seam shared by the client and the flow controller
//! - `FileSessionStore`: JSON file in the user's cache directory
//! - `MemorySessionStore`: in-process storage for tests and one-shot commands
//! - `Session`: a validated token + user pair read back from a store
//!
//! The store holds two string entries, `authToken` and `user`, which are
//! always written and cleared together.

pub mod session;
pub mod store;

pub use session::Session;
pub use store::{FileSessionStore, MemorySessionStore, SessionStore, StoredEntries};
