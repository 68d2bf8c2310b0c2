use tracing::warn;

use crate::models::User;

use super::StoredEntries;

/// A logged-in identity: bearer token plus the user it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: User,
}

impl Session {
    pub fn new(token: impl Into<String>, user: User) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }

    /// Rebuild a session from raw store entries.
    ///
    /// Returns `None` for partial state or a user record that does not parse.
    pub fn from_entries(entries: &StoredEntries) -> Option<Self> {
        if !entries.is_complete() {
            return None;
        }
        let token = entries.token.clone()?;
        let user = parse_user(entries.user.as_deref()?)?;
        Some(Self { token, user })
    }
}

/// Parse a persisted user record, treating malformed data as absent.
pub(crate) fn parse_user(raw: &str) -> Option<User> {
    match serde_json::from_str(raw) {
        Ok(user) => Some(user),
        Err(e) => {
            warn!(error = %e, "Stored user record is malformed, ignoring it");
            None
        }
    }
}
