use std::time::Duration;

use anyhow::Result;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::models::User;
use crate::Url;

/// Domain every tenant site lives under
pub const REDIRECT_BASE_DOMAIN: &str = "parque-e.co";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RedirectError {
    #[error("user {0} has no redirect target")]
    MissingTarget(String),

    #[error("redirect target {0:?} is not a valid subdomain")]
    InvalidTarget(String),
}

/// Host capability that sends the user to another site.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &Url) -> Result<()>;
}

/// Tenant URL for a user: `https://{subdomain}.parque-e.co`
pub fn redirect_url(user: &User) -> Result<Url, RedirectError> {
    let subdomain = user
        .redirect_target()
        .ok_or_else(|| RedirectError::MissingTarget(user.username.clone()))?;

    let invalid = || RedirectError::InvalidTarget(subdomain.to_string());
    if subdomain.split('.').any(str::is_empty) {
        return Err(invalid());
    }

    let host = format!("{}.{}", subdomain.to_ascii_lowercase(), REDIRECT_BASE_DOMAIN);
    let url = Url::parse(&format!("https://{}", host)).map_err(|_| invalid())?;

    // A path, userinfo, port or IDN in the target moves the host away from it
    if url.host_str() != Some(host.as_str()) {
        return Err(invalid());
    }
    Ok(url)
}

/// One-shot timer that posts `id` on `tx` after `delay`.
///
/// Dropping it aborts the timer, so whoever holds it decides how long the
/// redirect stays live.
#[derive(Debug)]
pub struct ScheduledRedirect {
    id: u64,
    handle: JoinHandle<()>,
}

impl ScheduledRedirect {
    pub fn spawn(id: u64, delay: Duration, tx: mpsc::Sender<u64>) -> Self {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the flow was torn down
            let _ = tx.send(id).await;
        });
        Self { id, handle }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for ScheduledRedirect {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
