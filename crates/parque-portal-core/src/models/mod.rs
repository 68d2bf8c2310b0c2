//! Data models for the authentication backend.
//!
//! - `user`: the user profile returned at login and persisted locally
//! - `server`: request and response bodies for the auth endpoints

pub mod server;
pub mod user;

pub use server::{Credentials, LoginResponse, ServerAck, ServerStatus, VerifiedUser};
pub use user::User;
