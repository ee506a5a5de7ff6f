//! Durable credential storage.
//!
//! Stores the session (both tokens plus cached profile) in
//! `<base>/session.json` with restricted permissions (0600). The store must
//! survive process restarts and must never panic on a corrupted file:
//! unparseable contents are treated as "no session" and removed.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::config::paths;
use crate::types::Session;

/// Session cache filename.
const SESSION_FILE: &str = "session.json";

/// File-backed credential store.
///
/// All mutation happens through `&self`; the filesystem is the single copy.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Opens a store rooted at the given directory.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(SESSION_FILE),
        }
    }

    /// Opens the store at the default CRMX home location.
    pub fn default_location() -> Self {
        Self::open(paths::crmx_home())
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Loads the persisted session, if any.
    ///
    /// A missing file is "no session". A corrupted file is also "no session":
    /// it is cleared so the next load starts clean. Never returns an error.
    pub fn load(&self) -> Option<Session> {
        if !self.path.exists() {
            return None;
        }

        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), %err, "failed to read session file");
                return None;
            }
        };

        match serde_json::from_str(&contents) {
            Ok(session) => Some(session),
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    %err,
                    "corrupted session file, clearing"
                );
                if let Err(err) = self.clear() {
                    tracing::warn!(%err, "failed to clear corrupted session file");
                }
                None
            }
        }
    }

    /// Persists the session with restricted permissions (0600).
    ///
    /// # Errors
    /// Returns an error if the operation fails.
    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents =
            serde_json::to_string_pretty(session).context("Failed to serialize session")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)
                .with_context(|| format!("Failed to open {} for writing", self.path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&self.path, contents)
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        Ok(())
    }

    /// Replaces only the access token, keeping refresh token and profile.
    ///
    /// No-op when there is no persisted session to update.
    ///
    /// # Errors
    /// Returns an error if the operation fails.
    pub fn update_access(&self, access: &str) -> Result<()> {
        if let Some(mut session) = self.load() {
            session.access = access.to_string();
            self.save(&session)?;
        }
        Ok(())
    }

    /// Removes the persisted session.
    ///
    /// # Errors
    /// Returns an error if the operation fails.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove {}", self.path.display()))?;
        }
        Ok(())
    }
}
