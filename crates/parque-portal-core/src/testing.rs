//! Shared fixtures for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use serde_json::{json, Value};

use crate::api::{SessionClient, SessionReset};
use crate::auth::{MemorySessionStore, SessionStore, StoredEntries};
use crate::flow::Navigator;
use crate::Url;

/// Nothing listens on port 1, so connections are refused immediately
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:1";

pub fn alice_json() -> Value {
    json!({
        "id": "a1",
        "username": "alice",
        "subdominio_redireccion": "alice",
        "email": null,
        "created_at": "2024-01-15T09:00:00",
        "last_login": "2024-06-01T08:00:00",
        "active": true,
        "account_type": "empresa",
    })
}

pub fn seeded_store(token: &str) -> Arc<MemorySessionStore> {
    Arc::new(MemorySessionStore::with_entries(StoredEntries::new(
        token,
        alice_json().to_string(),
    )))
}

/// Counts hard resets requested by the client.
#[derive(Clone, Default)]
pub struct ResetCounter(Arc<AtomicUsize>);

impl ResetCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    pub fn hook(&self) -> Arc<dyn SessionReset> {
        let counter = self.0.clone();
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }
}

pub fn client_for(
    base_url: &str,
    store: Arc<MemorySessionStore>,
    resets: &ResetCounter,
) -> SessionClient {
    SessionClient::new(base_url, store, resets.hook()).unwrap()
}

/// Navigator that records every visit along with whether the store still
/// held a session at that moment.
pub struct RecordingNavigator {
    store: Arc<MemorySessionStore>,
    fail: bool,
    visits: Mutex<Vec<(Url, bool)>>,
}

impl RecordingNavigator {
    pub fn new(store: Arc<MemorySessionStore>) -> Arc<Self> {
        Arc::new(Self {
            store,
            fail: false,
            visits: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(store: Arc<MemorySessionStore>) -> Arc<Self> {
        Arc::new(Self {
            store,
            fail: true,
            visits: Mutex::new(Vec::new()),
        })
    }

    pub fn visits(&self) -> Vec<(Url, bool)> {
        self.visits.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &Url) -> Result<()> {
        let had_session = !self.store.read()?.is_empty();
        self.visits.lock().unwrap().push((url.clone(), had_session));
        if self.fail {
            return Err(anyhow!("no browser available"));
        }
        Ok(())
    }
}
