use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /auth/login`.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Keep the password out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Response from `POST /auth/login`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub success: bool,
    pub message: Option<String>,
    pub token: Option<String>,
    pub user: Option<Value>,
}

/// Acknowledgement returned by `GET /auth/verify`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServerAck {
    #[serde(default)]
    pub success: bool,
    pub message: Option<String>,
    pub user: Option<VerifiedUser>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VerifiedUser {
    pub id: Option<Value>,
    pub username: Option<String>,
}

/// Liveness report from `GET /health`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerStatus {
    #[serde(default = "unknown_status")]
    pub status: String,
    pub database: Option<String>,
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn unknown_status() -> String {
    "unknown".to_string()
}

impl ServerStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }

    /// Parse the server timestamp (ISO-8601 without offset, as the backend emits it).
    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        let raw = self.timestamp.as_deref()?;
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
    }
}
