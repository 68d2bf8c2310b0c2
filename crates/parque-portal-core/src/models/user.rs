use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// User profile as returned by `POST /auth/login` and persisted alongside the token.
///
/// Fields the portal does not use are kept in `extra` so that the record
/// survives a persist/read cycle unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    /// Tenant subdomain the user is sent to after login.
    #[serde(
        rename = "subdominio_redireccion",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub redirect_subdomain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// Build a user with only a username and an optional redirect target.
    pub fn new(username: impl Into<String>, redirect_subdomain: Option<&str>) -> Self {
        Self {
            username: username.into(),
            redirect_subdomain: redirect_subdomain.map(str::to_string),
            id: None,
            email: None,
            account_type: None,
            active: None,
            last_login: None,
            extra: Map::new(),
        }
    }

    /// The redirect target, if one is set and not blank.
    pub fn redirect_target(&self) -> Option<&str> {
        self.redirect_subdomain
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_parses_backend_profile() {
        let json = r#"{
            "id": "6f1c",
            "username": "alice",
            "subdominio_redireccion": "alice",
            "email": null,
            "created_at": "2024-03-01T10:00:00",
            "last_login": "2024-05-02T08:30:00",
            "active": true,
            "account_type": "empresa"
        }"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.redirect_target(), Some("alice"));
        assert_eq!(user.active, Some(true));
        assert_eq!(user.email, None);
        assert_eq!(
            user.extra.get("created_at"),
            Some(&Value::String("2024-03-01T10:00:00".to_string()))
        );
    }

    #[test]
    fn test_user_unknown_fields_survive_serialization() {
        let json = r#"{"username":"bob","subdominio_redireccion":"bob","plan":{"tier":"pro"}}"#;
        let user: User = serde_json::from_str(json).unwrap();
        let reparsed: User = serde_json::from_str(&serde_json::to_string(&user).unwrap()).unwrap();
        assert_eq!(reparsed, user);
        assert!(reparsed.extra.contains_key("plan"));
    }

    #[test]
    fn test_redirect_target_blank_is_none() {
        assert_eq!(User::new("carol", Some("   ")).redirect_target(), None);
        assert_eq!(User::new("carol", Some("")).redirect_target(), None);
        assert_eq!(User::new("carol", None).redirect_target(), None);
        assert_eq!(User::new("carol", Some(" carol ")).redirect_target(), Some("carol"));
    }

    #[test]
    fn test_user_requires_username() {
        assert!(serde_json::from_str::<User>(r#"{"subdominio_redireccion":"x"}"#).is_err());
    }
}
