//! Application state management for the portal TUI.
//!
//! This module contains the `App` struct, which hosts the `AuthFlow`, the
//! login form state and the hooks the core library calls back into (hard
//! reset after a 401, browser navigation).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use parque_portal_core::flow::REDIRECT_DELAY_MS;
use parque_portal_core::{
    AuthErrorKind, AuthFlow, AuthState, Config, Credentials, FileSessionStore, FlowOutcome,
    Navigator, SessionClient, Url,
};
use tracing::{debug, info, warn};

// ============================================================================
// Constants
// ============================================================================

/// Maximum length for username input.
const MAX_USERNAME_LENGTH: usize = 50;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoginFocus {
    Username,
    Password,
    Button,
}

/// Opens redirect targets in the system browser.
pub struct BrowserNavigator;

impl Navigator for BrowserNavigator {
    fn navigate(&self, url: &Url) -> Result<()> {
        open::that(url.as_str()).with_context(|| format!("Failed to open {}", url))
    }
}

/// Main application state container
pub struct App {
    pub config: Config,
    pub flow: AuthFlow,
    client: SessionClient,
    navigator: Arc<dyn Navigator>,
    redirect_delay: Duration,
    reset_requested: Arc<AtomicBool>,
    /// Write `last_username` back to the config file after a login
    persist_config: bool,

    /// False until the startup session check has run for the current flow
    pub mounted: bool,

    // Login form state
    pub login_username: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,
    pub login_pending: bool,

    pub status_message: Option<String>,
    pub redirected_to: Option<Url>,
    pub quitting: bool,
    pub tick: usize,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let cache_dir = config.cache_dir()?;
        debug!(?cache_dir, "Session directory configured");

        let store = Arc::new(FileSessionStore::new(cache_dir));
        let reset_requested = Arc::new(AtomicBool::new(false));
        let flag = reset_requested.clone();
        let client = SessionClient::new(
            config.api_url(),
            store,
            Arc::new(move || flag.store(true, Ordering::SeqCst)),
        )?;

        let mut app = Self::with_parts(
            config,
            client,
            Arc::new(BrowserNavigator),
            reset_requested,
            Duration::from_millis(REDIRECT_DELAY_MS),
        );
        app.persist_config = true;
        Ok(app)
    }

    /// Assemble an app from already-built collaborators.
    ///
    /// `reset_requested` must be the flag the client's reset hook sets.
    pub fn with_parts(
        config: Config,
        client: SessionClient,
        navigator: Arc<dyn Navigator>,
        reset_requested: Arc<AtomicBool>,
        redirect_delay: Duration,
    ) -> Self {
        let flow = AuthFlow::new(client.clone(), navigator.clone()).with_redirect_delay(redirect_delay);

        let login_username = std::env::var("PARQUE_USERNAME")
            .ok()
            .or_else(|| config.last_username.clone())
            .unwrap_or_default();

        Self {
            config,
            flow,
            client,
            navigator,
            redirect_delay,
            reset_requested,
            persist_config: false,
            mounted: false,
            login_username,
            login_password: String::new(),
            login_focus: LoginFocus::Username,
            login_error: None,
            login_pending: false,
            status_message: None,
            redirected_to: None,
            quitting: false,
            tick: 0,
        }
    }

    pub fn api_url(&self) -> &str {
        self.client.base_url()
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Run the startup session check for the current flow
    pub async fn mount(&mut self) {
        self.flow.mount().await;
        self.mounted = true;
        if matches!(self.flow.state(), AuthState::Unauthenticated) {
            self.start_login();
        }
    }

    /// Reset the login form for a fresh attempt
    pub fn start_login(&mut self) {
        self.login_focus = if self.login_username.is_empty() {
            LoginFocus::Username
        } else {
            LoginFocus::Password
        };
        self.login_pending = false;
    }

    /// Validate the form and queue a submission.
    ///
    /// The run loop performs the actual request after redrawing, so the
    /// pending state is visible while it is in flight.
    pub fn request_login(&mut self) {
        if self.login_pending {
            return;
        }
        if self.login_username.trim().is_empty() || self.login_password.is_empty() {
            self.login_error = Some("Username and password required".to_string());
            return;
        }
        self.login_error = None;
        self.login_pending = true;
    }

    /// Submit the queued credentials through the flow
    pub async fn attempt_login(&mut self) {
        if !self.login_pending {
            return;
        }

        let username = self.login_username.trim().to_string();
        let credentials = Credentials::new(username.clone(), self.login_password.clone());

        match self.flow.submit_login(&credentials).await {
            Ok(()) => {
                info!(username = %username, "Login successful");
                self.login_password.clear();
                self.login_error = None;
                self.status_message = None;
                self.config.last_username = Some(username);
                if self.persist_config {
                    if let Err(e) = self.config.save() {
                        warn!(error = %e, "Failed to save config");
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, status = ?e.status, "Login failed");
                let message = match e.kind {
                    AuthErrorKind::Transport => {
                        "Unable to connect to server. Check your connection.".to_string()
                    }
                    _ => e.message,
                };
                self.login_error = Some(message);
            }
        }
        self.login_pending = false;
    }

    /// "Back to login" from the success screen
    pub fn return_to_login(&mut self) {
        self.flow.return_to_login();
        self.start_login();
    }

    pub async fn logout(&mut self) {
        self.flow.logout().await;
        self.status_message = Some("Signed out".to_string());
        self.start_login();
    }

    // =========================================================================
    // Background events
    // =========================================================================

    /// Apply hard resets and redirect timer events. Called once per loop.
    pub fn check_background_tasks(&mut self) {
        self.tick = self.tick.wrapping_add(1);

        if self.reset_requested.swap(false, Ordering::SeqCst) {
            self.remount();
            return;
        }

        match self.flow.try_next_event() {
            Some(FlowOutcome::Navigated(url)) => {
                info!(url = %url, "Left the portal");
                self.redirected_to = Some(url);
                self.quitting = true;
            }
            Some(FlowOutcome::RedirectAborted) => {
                self.status_message = Some("Could not open your site. Please sign in again.".to_string());
                self.start_login();
            }
            Some(FlowOutcome::Ignored) | None => {}
        }
    }

    /// Throw away the flow after a 401 and start over from the stored session.
    fn remount(&mut self) {
        warn!("Session rejected by server, restarting");
        self.flow = AuthFlow::new(self.client.clone(), self.navigator.clone())
            .with_redirect_delay(self.redirect_delay);
        self.mounted = false;
        self.login_password.clear();
        self.login_pending = false;
    }
}

// ============================================================================
// Input Validation
// ============================================================================

/// Check if a character is valid for text input (printable, no control chars)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if a username character should be accepted
pub fn can_add_username_char(current_len: usize, c: char) -> bool {
    current_len < MAX_USERNAME_LENGTH && is_valid_input_char(c)
}

/// Check if a password character should be accepted
pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parque_portal_core::{MemorySessionStore, SessionStore, StoredEntries, User};
    use serde_json::json;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct RecordingNavigator(Mutex<Vec<Url>>);

    impl Navigator for RecordingNavigator {
        fn navigate(&self, url: &Url) -> Result<()> {
            self.0.lock().unwrap().push(url.clone());
            Ok(())
        }
    }

    fn test_app(
        base_url: &str,
        store: Arc<MemorySessionStore>,
        navigator: Arc<RecordingNavigator>,
    ) -> App {
        let reset_requested = Arc::new(AtomicBool::new(false));
        let flag = reset_requested.clone();
        let client = SessionClient::new(
            base_url,
            store,
            Arc::new(move || flag.store(true, Ordering::SeqCst)),
        )
        .unwrap();
        let mut app = App::with_parts(
            Config::default(),
            client,
            navigator,
            reset_requested,
            Duration::from_millis(20),
        );
        app.login_username = "alice".to_string();
        app
    }

    fn alice_entries() -> StoredEntries {
        StoredEntries::new(
            "tok",
            json!({"username": "alice", "subdominio_redireccion": "alice"}).to_string(),
        )
    }

    // -------------------------------------------------------------------------
    // Login form
    // -------------------------------------------------------------------------

    #[test]
    fn test_request_login_requires_fields() {
        let mut app = test_app(
            "http://127.0.0.1:1",
            Arc::new(MemorySessionStore::new()),
            Arc::default(),
        );
        app.request_login();
        assert!(!app.login_pending);
        assert_eq!(app.login_error.as_deref(), Some("Username and password required"));

        app.login_password = "pw".to_string();
        app.request_login();
        assert!(app.login_pending);
        assert!(app.login_error.is_none());
    }

    #[test]
    fn test_start_login_focus() {
        let mut app = test_app(
            "http://127.0.0.1:1",
            Arc::new(MemorySessionStore::new()),
            Arc::default(),
        );
        app.start_login();
        assert_eq!(app.login_focus, LoginFocus::Password);

        app.login_username.clear();
        app.start_login();
        assert_eq!(app.login_focus, LoginFocus::Username);
    }

    #[tokio::test]
    async fn test_login_then_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "token": "tok-alice",
                "user": {"username": "alice", "subdominio_redireccion": "alice"},
            })))
            .mount(&server)
            .await;

        let store = Arc::new(MemorySessionStore::new());
        let navigator = Arc::new(RecordingNavigator::default());
        let mut app = test_app(&server.uri(), store.clone(), navigator.clone());
        app.mount().await;
        assert_eq!(app.flow.state(), &AuthState::Unauthenticated);

        app.login_password = "pw".to_string();
        app.request_login();
        app.attempt_login().await;
        assert_eq!(
            app.flow.state(),
            &AuthState::Authenticated(User::new("alice", Some("alice")))
        );
        assert!(app.login_password.is_empty());
        assert!(!app.login_pending);

        tokio::time::sleep(Duration::from_millis(100)).await;
        app.check_background_tasks();
        assert!(app.quitting);
        assert_eq!(
            app.redirected_to.as_ref().map(Url::as_str),
            Some("https://alice.parque-e.co/")
        );
        assert_eq!(navigator.0.lock().unwrap().len(), 1);
        assert!(store.read().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bad_password_shows_error_and_remounts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "success": false,
                "message": "Invalid username or password",
            })))
            .mount(&server)
            .await;

        let mut app = test_app(&server.uri(), Arc::new(MemorySessionStore::new()), Arc::default());
        app.mount().await;

        app.login_password = "wrong".to_string();
        app.request_login();
        app.attempt_login().await;
        assert_eq!(app.login_error.as_deref(), Some("Invalid username or password"));

        app.check_background_tasks();
        assert!(!app.mounted);
        assert!(app.login_password.is_empty());
        // The error survives the reset so the user sees why
        assert_eq!(app.login_error.as_deref(), Some("Invalid username or password"));

        app.mount().await;
        assert_eq!(app.flow.state(), &AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_login_after_logout_clears_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/verify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "token": "tok-alice",
                "user": {"username": "alice", "subdominio_redireccion": "alice"},
            })))
            .mount(&server)
            .await;

        let store = Arc::new(MemorySessionStore::with_entries(alice_entries()));
        let mut app = test_app(&server.uri(), store, Arc::default());
        app.mount().await;
        app.logout().await;
        assert_eq!(app.status_message.as_deref(), Some("Signed out"));

        app.login_password = "pw".to_string();
        app.request_login();
        app.attempt_login().await;
        assert!(matches!(app.flow.state(), AuthState::Authenticated(_)));
        assert!(app.status_message.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_server_message() {
        let mut app = test_app(
            "http://127.0.0.1:1",
            Arc::new(MemorySessionStore::new()),
            Arc::default(),
        );
        app.mount().await;
        app.login_password = "pw".to_string();
        app.request_login();
        app.attempt_login().await;
        assert_eq!(
            app.login_error.as_deref(),
            Some("Unable to connect to server. Check your connection.")
        );
        assert_eq!(app.flow.state(), &AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_return_to_login_clears_store() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/verify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .mount(&server)
            .await;

        let store = Arc::new(MemorySessionStore::with_entries(alice_entries()));
        let mut app = test_app(&server.uri(), store.clone(), Arc::default());
        app.mount().await;
        assert!(matches!(app.flow.state(), AuthState::Authenticated(_)));

        app.return_to_login();
        assert_eq!(app.flow.state(), &AuthState::Unauthenticated);
        assert!(store.read().unwrap().is_empty());
        assert_eq!(app.login_focus, LoginFocus::Password);
    }

    // -------------------------------------------------------------------------
    // Input Validation Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_can_add_username_char() {
        assert!(can_add_username_char(0, 'a'));
        assert!(can_add_username_char(49, 'z'));
        assert!(!can_add_username_char(50, 'a'));
        assert!(!can_add_username_char(0, '\x00'));
        assert!(!can_add_username_char(0, '\n'));
        assert!(!can_add_username_char(0, '\t'));
    }

    #[test]
    fn test_can_add_password_char() {
        assert!(can_add_password_char(0, 'a'));
        assert!(can_add_password_char(127, '!'));
        assert!(!can_add_password_char(128, 'a'));
        assert!(!can_add_password_char(0, '\r'));
    }
}
