//! Session client for the Parque-e authentication API.
//!
//! This module provides the `SessionClient` struct, which logs users in,
//! verifies and drops stored sessions, and probes backend health.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::auth::session::parse_user;
use crate::auth::{Session, SessionStore};
use crate::models::{Credentials, LoginResponse, ServerAck, ServerStatus, User};

use super::AuthError;

// ============================================================================
// Constants
// ============================================================================

/// Default HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Timeout for `GET /auth/verify`, kept short so startup checks stay snappy.
const VERIFY_TIMEOUT_SECS: u64 = 5;

const LOGIN_PATH: &str = "/auth/login";
const VERIFY_PATH: &str = "/auth/verify";
const LOGOUT_PATH: &str = "/auth/logout";
const HEALTH_PATH: &str = "/health";

/// Host capability invoked after a 401 response has cleared the stored session.
///
/// The host is expected to throw away its in-memory state and start over.
pub trait SessionReset: Send + Sync {
    fn hard_reset(&self);
}

impl<F> SessionReset for F
where
    F: Fn() + Send + Sync,
{
    fn hard_reset(&self) {
        self()
    }
}

/// Client for the authentication backend.
/// Clone is cheap - the HTTP client, store and reset hook are all shared.
#[derive(Clone)]
pub struct SessionClient {
    client: Client,
    base_url: String,
    store: Arc<dyn SessionStore>,
    reset: Arc<dyn SessionReset>,
    verify_timeout: Duration,
}

impl SessionClient {
    /// Create a new client for the API rooted at `base_url`
    pub fn new(
        base_url: impl Into<String>,
        store: Arc<dyn SessionStore>,
        reset: Arc<dyn SessionReset>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            store,
            reset,
            verify_timeout: Duration::from_secs(VERIFY_TIMEOUT_SECS),
        })
    }

    /// Override the verification timeout.
    pub fn with_verify_timeout(mut self, timeout: Duration) -> Self {
        self.verify_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ===== Authentication =====

    /// Exchange credentials for a session and persist it.
    ///
    /// Nothing is written to the store unless the server reports success and
    /// returns a token and a user. A session that cannot be saved is an error.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let url = self.endpoint(LOGIN_PATH);
        debug!(url = %url, username = %credentials.username, "Sending login request");

        let response = self.execute(self.client.post(&url).json(credentials)).await?;
        let status = response.status();
        let (body, raw): (LoginResponse, Value) = Self::read_json(response).await?;

        let (token, user_value) = match (body.success, body.token, body.user) {
            (true, Some(token), Some(user)) if !token.is_empty() => (token, user),
            _ => {
                warn!(username = %credentials.username, "Login response did not grant a session");
                return Err(AuthError::rejected(status, raw));
            }
        };

        let user: User = serde_json::from_value(user_value.clone())
            .map_err(|e| AuthError::invalid_response(status, e, &raw.to_string()))?;

        if let Err(e) = self.store.write(&token, &user_value.to_string()) {
            error!(error = %e, "Failed to save session");
            return Err(AuthError::storage(&e));
        }

        info!(username = %user.username, "Login successful");
        Ok(Session::new(token, user))
    }

    /// Check the stored token with the backend.
    ///
    /// Any failure clears the stored session before the error is returned.
    pub async fn verify_token(&self) -> Result<ServerAck, AuthError> {
        let url = self.endpoint(VERIFY_PATH);
        let request = self.client.get(&url).timeout(self.verify_timeout);

        let result = async {
            let response = self.execute(request).await?;
            let body = response.text().await.map_err(|e| AuthError::transport(&e))?;
            Ok::<_, AuthError>(Self::parse_ack(&body))
        }
        .await;

        if let Err(ref e) = result {
            info!(error = %e, status = ?e.status, "Token verification failed, clearing session");
            self.clear_session();
        }
        result
    }

    /// Tell the backend the session is over and drop it locally.
    ///
    /// The local session is always cleared, whatever happens to the request.
    pub async fn logout(&self) {
        if self.get_token().is_some() {
            let url = self.endpoint(LOGOUT_PATH);
            match self.execute(self.client.post(&url)).await {
                Ok(_) => debug!("Logout acknowledged by server"),
                Err(e) => warn!(error = %e, "Logout request failed"),
            }
        } else {
            // The endpoint requires a token, so without one it can only answer 401
            debug!("No stored token, skipping logout request");
        }

        self.clear_session();
    }

    /// Unauthenticated liveness probe.
    pub async fn health_check(&self) -> Result<ServerStatus, AuthError> {
        let url = self.endpoint(HEALTH_PATH);
        let response = self.execute(self.client.get(&url)).await?;
        let (status, _): (ServerStatus, Value) = Self::read_json(response).await?;
        Ok(status)
    }

    // ===== Stored session =====

    /// True when both a token and a user record are stored. No network.
    ///
    /// Only the presence of the raw entries is checked: an unparseable user
    /// record still counts here but makes `get_user` return `None`.
    pub fn is_authenticated(&self) -> bool {
        match self.store.read() {
            Ok(entries) => entries.is_complete(),
            Err(e) => {
                warn!(error = %e, "Failed to read session store");
                false
            }
        }
    }

    /// The stored user, or `None` if absent or malformed
    pub fn get_user(&self) -> Option<User> {
        match self.store.read() {
            Ok(entries) => entries.user.as_deref().and_then(parse_user),
            Err(e) => {
                warn!(error = %e, "Failed to read session store");
                None
            }
        }
    }

    pub fn get_token(&self) -> Option<String> {
        match self.store.read() {
            Ok(entries) => entries.token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read session store");
                None
            }
        }
    }

    /// The stored session, when it is complete and the user record parses
    pub fn get_session(&self) -> Option<Session> {
        self.store.read().ok().and_then(|e| Session::from_entries(&e))
    }

    /// Drop the stored session without contacting the server.
    pub fn clear_session(&self) {
        if let Err(e) = self.store.clear() {
            error!(error = %e, "Failed to clear session");
        }
    }

    // ===== Request pipeline =====

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.get_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request with the stored credentials and check its status.
    async fn execute(&self, request: RequestBuilder) -> Result<Response, AuthError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| AuthError::transport(&e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.reset_session(response.url().as_str());
        }

        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(AuthError::from_status(status, &body))
        }
    }

    fn reset_session(&self, url: &str) {
        warn!(url = url, "Unauthorized response, resetting session");
        self.clear_session();
        self.reset.hard_reset();
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<(T, Value), AuthError> {
        let status = response.status();
        let text = response.text().await.map_err(|e| AuthError::transport(&e))?;
        let raw: Value = serde_json::from_str(&text)
            .map_err(|e| AuthError::invalid_response(status, e, &text))?;
        let parsed = serde_json::from_value(raw.clone())
            .map_err(|e| AuthError::invalid_response(status, e, &text))?;
        Ok((parsed, raw))
    }

    /// Any 2xx counts as a valid token, so an odd body is not an error here
    fn parse_ack(body: &str) -> ServerAck {
        if body.trim().is_empty() {
            return ServerAck::default();
        }
        serde_json::from_str(body).unwrap_or_else(|e| {
            debug!(error = %e, "Unrecognized verify response body");
            ServerAck::default()
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
