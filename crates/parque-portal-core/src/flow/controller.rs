//! Authentication state machine.
//!
//! `AuthFlow` starts in `Loading`, settles into `Authenticated` or
//! `Unauthenticated` once `mount` has checked the stored session, and from
//! then on moves only in response to login, logout, "back to login" and the
//! redirect timer. Every failure path ends in `Unauthenticated`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::api::{AuthError, SessionClient};
use crate::models::{Credentials, User};
use crate::Url;

use super::redirect::{redirect_url, Navigator, ScheduledRedirect};

/// Delay between a successful login and the redirect, so the success
/// screen is visible.
pub const REDIRECT_DELAY_MS: u64 = 2000;

/// Buffer size for redirect timer events. Only one redirect is pending at a time.
const CHANNEL_BUFFER_SIZE: usize = 4;

/// Which screen the user should be looking at
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Loading,
    Authenticated(User),
    Unauthenticated,
}

/// Result of processing a redirect timer event
#[derive(Debug, Clone, PartialEq)]
pub enum FlowOutcome {
    /// The user was sent to their tenant site
    Navigated(Url),
    /// The redirect could not happen and the flow went back to the login form
    RedirectAborted,
    /// A timer event from a redirect that has since been released
    Ignored,
}

struct PendingRedirect {
    user: User,
    timer: ScheduledRedirect,
}

pub struct AuthFlow {
    client: SessionClient,
    navigator: Arc<dyn Navigator>,
    state: AuthState,
    redirect_delay: Duration,
    pending_redirect: Option<PendingRedirect>,
    next_redirect_id: u64,
    redirect_tx: mpsc::Sender<u64>,
    redirect_rx: mpsc::Receiver<u64>,
}

impl AuthFlow {
    pub fn new(client: SessionClient, navigator: Arc<dyn Navigator>) -> Self {
        let (redirect_tx, redirect_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        Self {
            client,
            navigator,
            state: AuthState::Loading,
            redirect_delay: Duration::from_millis(REDIRECT_DELAY_MS),
            pending_redirect: None,
            next_redirect_id: 0,
            redirect_tx,
            redirect_rx,
        }
    }

    pub fn with_redirect_delay(mut self, delay: Duration) -> Self {
        self.redirect_delay = delay;
        self
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, AuthState::Loading)
    }

    pub fn user(&self) -> Option<&User> {
        match &self.state {
            AuthState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn has_pending_redirect(&self) -> bool {
        self.pending_redirect.is_some()
    }

    pub fn client(&self) -> &SessionClient {
        &self.client
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Startup check of the stored session. Always leaves `Loading`.
    pub async fn mount(&mut self) {
        self.state = AuthState::Loading;
        self.state = self.check_stored_session().await;
    }

    async fn check_stored_session(&mut self) -> AuthState {
        if !self.client.is_authenticated() {
            debug!("No stored session");
            return AuthState::Unauthenticated;
        }

        // A session whose user cannot be read is as good as an invalid one
        let Some(user) = self.client.get_user() else {
            warn!("Stored user record unreadable, clearing auth state");
            self.client.logout().await;
            return AuthState::Unauthenticated;
        };

        match self.client.verify_token().await {
            Ok(_) => {
                info!(username = %user.username, "Stored session verified");
                AuthState::Authenticated(user)
            }
            Err(e) => {
                info!(error = %e, "Token invalid, clearing auth state");
                self.client.logout().await;
                AuthState::Unauthenticated
            }
        }
    }

    /// Submit credentials on behalf of the login form.
    ///
    /// On success the flow enters `Authenticated` and schedules the redirect;
    /// on failure the state is untouched and the error goes back to the form.
    pub async fn submit_login(&mut self, credentials: &Credentials) -> Result<(), AuthError> {
        let session = self.client.login(credentials).await?;
        self.on_login_success(session.user);
        Ok(())
    }

    /// Enter `Authenticated` and schedule the one-shot redirect.
    pub fn on_login_success(&mut self, user: User) {
        self.next_redirect_id += 1;
        let id = self.next_redirect_id;
        debug!(username = %user.username, id, delay_ms = self.redirect_delay.as_millis() as u64, "Scheduling redirect");

        let timer = ScheduledRedirect::spawn(id, self.redirect_delay, self.redirect_tx.clone());
        self.state = AuthState::Authenticated(user.clone());
        self.pending_redirect = Some(PendingRedirect { user, timer });
    }

    /// "Back to login": drop the stored session locally, no network.
    pub fn return_to_login(&mut self) {
        self.release_redirect();
        self.client.clear_session();
        self.state = AuthState::Unauthenticated;
    }

    /// Explicit logout from any state.
    pub async fn logout(&mut self) {
        self.release_redirect();
        self.client.logout().await;
        self.state = AuthState::Unauthenticated;
    }

    fn release_redirect(&mut self) {
        if let Some(pending) = self.pending_redirect.take() {
            debug!(id = pending.timer.id(), "Releasing pending redirect");
        }
    }

    // =========================================================================
    // Redirect events
    // =========================================================================

    /// Wait for the pending redirect to fire and carry it out.
    ///
    /// Returns `None` straight away when nothing is scheduled.
    pub async fn next_event(&mut self) -> Option<FlowOutcome> {
        self.pending_redirect.as_ref()?;
        let id = self.redirect_rx.recv().await?;
        Some(self.handle_redirect_due(id))
    }

    /// Non-blocking variant of `next_event` for polling loops.
    pub fn try_next_event(&mut self) -> Option<FlowOutcome> {
        let id = self.redirect_rx.try_recv().ok()?;
        Some(self.handle_redirect_due(id))
    }

    fn handle_redirect_due(&mut self, id: u64) -> FlowOutcome {
        let user = match self.pending_redirect.take() {
            Some(pending) if pending.timer.id() == id => pending.user,
            other => {
                self.pending_redirect = other;
                debug!(id, "Ignoring stale redirect event");
                return FlowOutcome::Ignored;
            }
        };

        let url = match redirect_url(&user) {
            Ok(url) => url,
            Err(e) => {
                error!(username = %user.username, error = %e, "Cannot redirect user");
                self.state = AuthState::Unauthenticated;
                return FlowOutcome::RedirectAborted;
            }
        };

        info!(url = %url, "Redirecting");
        // Control leaves the portal, so the session must not outlive the redirect
        self.client.clear_session();

        match self.navigator.navigate(&url) {
            Ok(()) => FlowOutcome::Navigated(url),
            Err(e) => {
                error!(url = %url, error = %e, "Redirect failed");
                self.state = AuthState::Unauthenticated;
                FlowOutcome::RedirectAborted
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
