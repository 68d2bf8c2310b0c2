use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Message used when neither the server nor the transport says anything useful
pub const DEFAULT_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Maximum length for error response bodies kept in errors
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// Connection failure, timeout, or a body that could not be read
    Transport,
    /// 401, a failed verification, or a login the server did not accept
    Rejected,
    /// Any other non-success status
    Response,
    /// A success status with a body we could not use
    InvalidResponse,
    /// The session could not be written to the local store
    Storage,
}

/// Normalized failure returned by every `SessionClient` operation.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct AuthError {
    pub kind: AuthErrorKind,
    pub message: String,
    pub status: Option<u16>,
    pub data: Option<Value>,
}

impl AuthError {
    pub fn transport(err: &reqwest::Error) -> Self {
        let text = err.to_string();
        Self {
            kind: AuthErrorKind::Transport,
            message: non_empty_or_default(text),
            status: err.status().map(|s| s.as_u16()),
            data: None,
        }
    }

    /// Build an error from a non-success response.
    ///
    /// The message prefers the server's `message` field and falls back to the
    /// status line.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let data = parse_body(body);
        let message = data
            .as_ref()
            .and_then(server_message)
            .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()));

        let kind = if status == StatusCode::UNAUTHORIZED {
            AuthErrorKind::Rejected
        } else {
            AuthErrorKind::Response
        };

        Self {
            kind,
            message,
            status: Some(status.as_u16()),
            data,
        }
    }

    /// A 2xx login response that did not carry `success` and a token.
    pub fn rejected(status: StatusCode, data: Value) -> Self {
        let message = server_message(&data).unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string());
        Self {
            kind: AuthErrorKind::Rejected,
            message,
            status: Some(status.as_u16()),
            data: Some(data),
        }
    }

    pub fn invalid_response(status: StatusCode, reason: impl std::fmt::Display, body: &str) -> Self {
        Self {
            kind: AuthErrorKind::InvalidResponse,
            message: format!("Invalid response from server: {}", reason),
            status: Some(status.as_u16()),
            data: parse_body(body),
        }
    }

    /// The local store refused a session the server granted.
    pub fn storage(err: &anyhow::Error) -> Self {
        Self {
            kind: AuthErrorKind::Storage,
            message: format!("Could not save session: {:#}", err),
            status: None,
            data: None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(StatusCode::UNAUTHORIZED.as_u16())
    }
}

fn server_message(data: &Value) -> Option<String> {
    data.get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
}

fn non_empty_or_default(text: String) -> String {
    if text.trim().is_empty() {
        DEFAULT_ERROR_MESSAGE.to_string()
    } else {
        text
    }
}

/// JSON bodies are kept as-is, anything else as a truncated string.
fn parse_body(body: &str) -> Option<Value> {
    if body.trim().is_empty() {
        return None;
    }
    serde_json::from_str(body)
        .ok()
        .or_else(|| Some(Value::String(truncate_body(body))))
}

/// Truncate a response body to avoid carrying excessive data around
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_status_prefers_server_message() {
        let err = AuthError::from_status(
            StatusCode::UNAUTHORIZED,
            r#"{"success":false,"message":"Invalid username or password"}"#,
        );
        assert_eq!(err.kind, AuthErrorKind::Rejected);
        assert_eq!(err.message, "Invalid username or password");
        assert_eq!(err.status, Some(401));
        assert_eq!(err.data.unwrap()["success"], json!(false));
        assert_eq!(
            AuthError::from_status(StatusCode::UNAUTHORIZED, "").to_string(),
            "Request failed with status code 401"
        );
    }

    #[test]
    fn test_from_status_falls_back_to_status_text() {
        let err = AuthError::from_status(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert_eq!(err.kind, AuthErrorKind::Response);
        assert_eq!(err.message, "Request failed with status code 502");
        assert_eq!(err.data, Some(Value::String("<html>bad gateway</html>".to_string())));
    }

    #[test]
    fn test_from_status_blank_message_ignored() {
        let err = AuthError::from_status(StatusCode::BAD_REQUEST, r#"{"message":"  "}"#);
        assert_eq!(err.message, "Request failed with status code 400");
    }

    #[test]
    fn test_from_status_empty_body() {
        let err = AuthError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert!(err.data.is_none());
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn test_rejected_without_message_uses_default() {
        let err = AuthError::rejected(StatusCode::OK, json!({"success": false}));
        assert_eq!(err.kind, AuthErrorKind::Rejected);
        assert_eq!(err.message, DEFAULT_ERROR_MESSAGE);
        assert_eq!(err.status, Some(200));
    }

    #[test]
    fn test_truncate_body() {
        let long = "é".repeat(400);
        let truncated = truncate_body(&long);
        assert!(truncated.contains("truncated, 800 total bytes"));
        assert_eq!(truncate_body("short"), "short");
    }
}
