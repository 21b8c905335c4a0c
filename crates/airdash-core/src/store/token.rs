//! Credential storage.
//!
//! Stores the bearer credential and the profile it was issued for in
//! `<base>/session.json` with restricted permissions (0600).
//! Tokens are never logged or displayed in full.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use tracing::warn;

use super::{remove_if_exists, write_private};
use crate::config::paths;
use crate::models::{Session, StoredAuth};

/// File-backed credential store.
///
/// Clones share one lock so read-modify-write sequences (`update_user`,
/// `clear_if`) never interleave within a process.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Store at `${AIRDASH_HOME}/session.json`.
    pub fn at_default_path() -> Self {
        Self::new(paths::session_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored credential.
    ///
    /// Returns `Ok(None)` when nothing is stored; an unparseable file is an error.
    pub fn load(&self) -> Result<Option<StoredAuth>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.load_unlocked()
    }

    /// Loads the stored credential, treating an unreadable file as absent.
    pub fn read(&self) -> Option<StoredAuth> {
        match self.load() {
            Ok(stored) => stored,
            Err(err) => {
                warn!(path = %self.path.display(), error = %format!("{err:#}"), "ignoring unreadable credential");
                None
            }
        }
    }

    /// Persists a credential together with its profile.
    pub fn save(&self, stored: &StoredAuth) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.save_unlocked(stored)
    }

    /// Replaces the stored profile, keeping the credential.
    ///
    /// Returns false (and writes nothing) when no credential is stored.
    pub fn update_user(&self, user: &Session) -> Result<bool> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(mut stored) = self.load_unlocked()? else {
            return Ok(false);
        };
        stored.user = user.clone();
        self.save_unlocked(&stored)?;
        Ok(true)
    }

    /// Removes the stored credential.
    pub fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        remove_if_exists(&self.path)
    }

    /// Removes the stored credential only if it still holds `token`.
    ///
    /// A rejection that belongs to an older credential must not erase a
    /// newer login. An unreadable file is removed as well.
    pub fn clear_if(&self, token: &str) -> Result<bool> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let matches = match self.load_unlocked() {
            Ok(Some(stored)) => stored.credential.token == token,
            Ok(None) => return Ok(false),
            Err(_) => true,
        };
        if matches {
            remove_if_exists(&self.path)?;
        }
        Ok(matches)
    }

    fn load_unlocked(&self) -> Result<Option<StoredAuth>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read credential from {}", self.path.display()))?;
        let stored = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse credential from {}", self.path.display()))?;
        Ok(Some(stored))
    }

    fn save_unlocked(&self, stored: &StoredAuth) -> Result<()> {
        let contents =
            serde_json::to_string_pretty(stored).context("Failed to serialize credential")?;
        write_private(&self.path, &contents)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use tempfile::tempdir;

    use super::*;
    use crate::models::{AccountState, Credential, Role};

    fn stored(token: &str) -> StoredAuth {
        StoredAuth {
            credential: Credential::new(token),
            user: Session {
                user_id: "u1".to_string(),
                email: "an@example.com".to_string(),
                first_name: "An".to_string(),
                last_name: "Nguyen".to_string(),
                role: Role::User,
                favorites: BTreeSet::new(),
                has_password: true,
                status: AccountState::Active,
                is_active: true,
            },
        }
    }

    #[test]
    fn test_missing_file_reads_as_absent() {
        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("session.json"));

        assert_eq!(store.load().unwrap(), None);
        assert_eq!(store.read(), None);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("nested").join("session.json"));

        store.save(&stored("token-aaaaaaaaaaaa")).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.credential.token, "token-aaaaaaaaaaaa");
        assert_eq!(loaded.user.email, "an@example.com");
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("session.json"));
        store.save(&stored("token-aaaaaaaaaaaa")).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_corrupt_file_is_error_but_reads_as_absent() {
        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("session.json"));
        fs::write(store.path(), "{not json").unwrap();

        assert!(store.load().is_err());
        assert_eq!(store.read(), None);
    }

    #[test]
    fn test_update_user_requires_credential() {
        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("session.json"));
        let mut user = stored("t").user;
        user.first_name = "Binh".to_string();

        assert!(!store.update_user(&user).unwrap());
        assert!(!store.path().exists());

        store.save(&stored("token-aaaaaaaaaaaa")).unwrap();
        assert!(store.update_user(&user).unwrap());
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.user.first_name, "Binh");
        assert_eq!(loaded.credential.token, "token-aaaaaaaaaaaa");
    }

    #[test]
    fn test_clear_if_only_removes_matching_token() {
        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("session.json"));
        store.save(&stored("new-token-bbbbbbbb")).unwrap();

        assert!(!store.clear_if("old-token-aaaaaaaa").unwrap());
        assert!(store.load().unwrap().is_some());

        assert!(store.clear_if("new-token-bbbbbbbb").unwrap());
        assert!(store.load().unwrap().is_none());

        // Clearing an empty store is fine.
        store.clear().unwrap();
        assert!(!store.clear_if("new-token-bbbbbbbb").unwrap());
    }
}
