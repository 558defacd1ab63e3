//! File-backed token store.
//!
//! Each token is stored as a separate entry with its own fixed expiry, the
//! way a browser keeps them as two cookies. Expired entries read as absent.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::traits::TokenStore;
use crate::{AccessToken, RefreshToken, Result, TokenPair};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

/// Default lifetime of a persisted token entry, in seconds (one day).
pub const DEFAULT_ENTRY_LIFETIME_SECS: i64 = 86_400;

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry<T> {
    value: T,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredTokens {
    access_token: StoredEntry<AccessToken>,
    refresh_token: StoredEntry<RefreshToken>,
    expires_in: u64,
    issued_at: DateTime<Utc>,
}

/// Persists the token pair as JSON in a single owner-only file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
    lifetime: Duration,
}

impl FileTokenStore {
    /// Create a store backed by `path`. The file is created on first `set`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lifetime: Duration::seconds(DEFAULT_ENTRY_LIFETIME_SECS),
        }
    }

    /// Override how long a stored entry stays readable.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<StoredTokens>> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(&self.path, e).into()),
        };

        let stored = serde_json::from_str(&json).map_err(|e| StorageError::corrupt(&self.path, e))?;
        Ok(Some(stored))
    }

    fn write(&self, stored: &StoredTokens) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }

        let json =
            serde_json::to_string_pretty(stored).map_err(|e| StorageError::corrupt(&self.path, e))?;

        // A leftover tmp file keeps its old mode, so start from a fresh one
        // that is owner-only from the moment it exists.
        let tmp = self.path.with_extension("tmp");
        match fs::remove_file(&tmp) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::io(&tmp, e).into()),
        }

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&tmp).map_err(|e| StorageError::io(&tmp, e))?;
        file.write_all(json.as_bytes()).map_err(|e| StorageError::io(&tmp, e))?;
        drop(file);

        fs::rename(&tmp, &self.path).map_err(|e| StorageError::io(&self.path, e))?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Result<Option<TokenPair>> {
        let Some(stored) = self.read()? else {
            return Ok(None);
        };

        let now = Utc::now();
        if stored.access_token.expires_at <= now || stored.refresh_token.expires_at <= now {
            debug!(path = %self.path.display(), "Stored tokens expired");
            return Ok(None);
        }

        Ok(Some(TokenPair {
            access_token: stored.access_token.value,
            refresh_token: stored.refresh_token.value,
            expires_in: stored.expires_in,
            issued_at: stored.issued_at,
        }))
    }

    fn set(&self, pair: TokenPair) -> Result<()> {
        let expires_at = Utc::now()
            .checked_add_signed(self.lifetime)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let stored = StoredTokens {
            access_token: StoredEntry {
                value: pair.access_token,
                expires_at,
            },
            refresh_token: StoredEntry {
                value: pair.refresh_token,
                expires_at,
            },
            expires_in: pair.expires_in,
            issued_at: pair.issued_at,
        };

        self.write(&stored)
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to remove token file");
                Err(StorageError::io(&self.path, e).into())
            }
        }
    }
}
