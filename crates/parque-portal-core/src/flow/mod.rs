//! Authentication flow for the portal front end.
//!
//! `AuthFlow` decides which of three screens the user sees (loading, signed
//! in and about to be redirected, login form) and owns the delayed redirect
//! to the user's tenant site.

pub mod controller;
pub mod redirect;

pub use controller::{AuthFlow, AuthState, FlowOutcome, REDIRECT_DELAY_MS};
pub use redirect::{redirect_url, Navigator, RedirectError, ScheduledRedirect, REDIRECT_BASE_DOMAIN};
