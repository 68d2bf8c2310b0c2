//! HTTP client for the authentication backend.
//!
//! `SessionClient` is the only component that issues requests to the auth
//! API and the only one that writes the session store. Every request carries
//! the stored bearer token when there is one, and any 401 response clears
//! the stored session and triggers the host's `SessionReset`.

pub mod client;
pub mod error;

pub use client::{SessionClient, SessionReset};
pub use error::{AuthError, AuthErrorKind};
