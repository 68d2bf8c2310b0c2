use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Session file name in the cache directory
const SESSION_FILE: &str = "session.json";

/// Raw contents of a session store, serialized under the `authToken` and
/// `user` keys.
///
/// Either entry may be missing when the backing storage was edited or
/// damaged by something other than this crate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntries {
    #[serde(rename = "authToken", default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(rename = "user", default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl StoredEntries {
    pub fn new(token: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            user: Some(user.into()),
        }
    }

    /// Both entries present and non-empty. Says nothing about whether the
    /// user entry parses.
    pub fn is_complete(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        present(&self.token) && present(&self.user)
    }

    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.user.is_none()
    }
}

/// Key-value storage for the persisted session.
///
/// Token and user are written and cleared in one call so that an
/// implementation can never be left holding one without the other.
pub trait SessionStore: Send + Sync {
    /// Read both entries.
    fn read(&self) -> Result<StoredEntries>;

    /// Replace both entries.
    fn write(&self, token: &str, user: &str) -> Result<()>;

    /// Remove both entries. Clearing an empty store is a no-op.
    fn clear(&self) -> Result<()>;
}

// ============================================================================
// File-backed store
// ============================================================================

/// Session store kept as a JSON file on disk.
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    fn temp_path(&self) -> PathBuf {
        self.dir.join(format!("{}.tmp", SESSION_FILE))
    }

    fn write_entries(&self, entries: &StoredEntries) -> Result<()> {
        std::fs::create_dir_all(&self.dir).context("Failed to create session directory")?;

        let contents = serde_json::to_string_pretty(entries)?;
        let tmp = self.temp_path();
        std::fs::write(&tmp, contents).context("Failed to write session file")?;
        restrict_permissions(&tmp)?;

        // Rename is atomic on the same filesystem, so readers see old or new, never half
        std::fs::rename(&tmp, self.path()).context("Failed to replace session file")?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn read(&self) -> Result<StoredEntries> {
        let path = self.path();
        if !path.exists() {
            return Ok(StoredEntries::default());
        }

        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        match serde_json::from_str(&contents) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Session file is malformed, treating as empty");
                Ok(StoredEntries::default())
            }
        }
    }

    fn write(&self, token: &str, user: &str) -> Result<()> {
        self.write_entries(&StoredEntries::new(token, user))?;
        debug!(path = %self.path().display(), "Session saved");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let path = self.path();
        if path.exists() {
            std::fs::remove_file(&path).context("Failed to remove session file")?;
            debug!(path = %path.display(), "Session file removed");
        }
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .context("Failed to restrict session file permissions")
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

// ============================================================================
// In-memory store
// ============================================================================

/// Session store held in memory.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: Mutex<StoredEntries>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from arbitrary entries, including partial or malformed ones.
    pub fn with_entries(entries: StoredEntries) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    pub fn snapshot(&self) -> StoredEntries {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SessionStore for MemorySessionStore {
    fn read(&self) -> Result<StoredEntries> {
        Ok(self.snapshot())
    }

    fn write(&self, token: &str, user: &str) -> Result<()> {
        *self.entries.lock().unwrap_or_else(PoisonError::into_inner) = StoredEntries::new(token, user);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.entries.lock().unwrap_or_else(PoisonError::into_inner) = StoredEntries::default();
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
