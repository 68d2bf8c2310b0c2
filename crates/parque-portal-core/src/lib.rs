//! Core library for parque-portal.
//!
//! This crate contains everything the login portal needs apart from the
//! terminal front end:
//! - `api`: the `SessionClient` that talks to the authentication backend
//! - `auth`: persisted session state behind the `SessionStore` trait
//! - `flow`: the `AuthFlow` state machine and the post-login redirect
//! - `config`: user configuration and directory locations
//! - `models`: user and server response types

pub mod api;
pub mod auth;
pub mod config;
pub mod flow;
pub mod models;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{AuthError, AuthErrorKind, SessionClient, SessionReset};
pub use auth::{FileSessionStore, MemorySessionStore, Session, SessionStore, StoredEntries};
pub use config::Config;
pub use flow::{redirect_url, AuthFlow, AuthState, FlowOutcome, Navigator, RedirectError};
pub use models::{Credentials, ServerAck, ServerStatus, User};

/// URL type used for the API base and redirect targets.
pub use reqwest::Url;
