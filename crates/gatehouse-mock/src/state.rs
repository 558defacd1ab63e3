//! On-disk state of the mock backend.

use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use gatehouse_core::Result;
use gatehouse_core::error::StorageError;
use gatehouse_core::{Role, User, UserId};

const STATE_FILE: &str = "mock_api_data.json";
const LOCK_FILE: &str = "mock_api_data.lock";

/// bcrypt cost for mock password hashes. Low on purpose: these are fixtures.
pub(crate) const HASH_COST: u32 = 4;

/// A user row plus its password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredUser {
    #[serde(flatten)]
    pub user: User,
    pub password_hash: String,
}

/// Everything the mock API remembers between calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct MockState {
    pub users: Vec<StoredUser>,
    #[serde(default)]
    pub current_user: Option<UserId>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl MockState {
    /// The fixture accounts every fresh state starts with.
    pub fn seeded() -> Result<Self> {
        let seed = [
            ("123e4567-e89b-12d3-a456-426614174000", "admin@example.com", "admin", "Admin", Role::Admin, "admin123"),
            ("456e7890-e89b-12d3-a456-426614174001", "user@example.com", "user", "Regular", Role::User, "user123"),
            ("789e0123-e89b-12d3-a456-426614174002", "user2@example.com", "user2", "Another", Role::User, "user123"),
        ];

        let users = seed
            .into_iter()
            .map(|(id, email, username, first_name, role, password)| {
                Ok(StoredUser {
                    user: User {
                        id: UserId::new(id)?,
                        email: email.to_string(),
                        username: username.to_string(),
                        first_name: first_name.to_string(),
                        last_name: "User".to_string(),
                        role,
                        status: "active".to_string(),
                        email_verified: false,
                    },
                    password_hash: hash_password(password)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            users,
            ..Self::default()
        })
    }

    pub fn find(&self, id: &UserId) -> Option<&StoredUser> {
        self.users.iter().find(|u| &u.user.id == id)
    }

    pub fn find_by_email(&self, email: &str) -> Option<&StoredUser> {
        self.users.iter().find(|u| u.user.email == email)
    }

    /// Returns true if another user already has `email` or `username`.
    pub fn is_taken(&self, email: Option<&str>, username: Option<&str>, except: Option<&UserId>) -> bool {
        self.users.iter().any(|u| {
            Some(&u.user.id) != except
                && (email == Some(u.user.email.as_str()) || username == Some(u.user.username.as_str()))
        })
    }

    pub fn end_session(&mut self) {
        self.current_user = None;
        self.access_token = None;
        self.refresh_token = None;
    }
}

pub(crate) fn hash_password(password: &str) -> Result<String> {
    bcrypt::hash(password, HASH_COST).map_err(|e| {
        gatehouse_core::error::InvalidInputError::Other {
            message: format!("failed to hash password: {}", e),
        }
        .into()
    })
}

pub(crate) fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// The JSON state file, guarded by an advisory lock file.
#[derive(Debug, Clone)]
pub(crate) struct StateFile {
    root: PathBuf,
}

impl StateFile {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self) -> PathBuf {
        self.root.join(STATE_FILE)
    }

    fn lock_file(&self) -> Result<File> {
        fs::create_dir_all(&self.root).map_err(|e| StorageError::io(&self.root, e))?;
        let path = self.root.join(LOCK_FILE);
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| StorageError::io(&path, e).into())
    }

    /// Read the state; a missing file yields the seeded fixtures.
    pub fn read(&self) -> Result<MockState> {
        let lock = self.lock_file()?;
        FileExt::lock_shared(&lock).map_err(|e| StorageError::io(self.root.join(LOCK_FILE), e))?;
        let state = self.load();
        FileExt::unlock(&lock).map_err(|e| StorageError::io(self.root.join(LOCK_FILE), e))?;
        state
    }

    /// Apply `f` to the state under an exclusive lock and persist the result.
    ///
    /// Nothing is written if `f` fails.
    #[instrument(skip_all, fields(root = %self.root.display()))]
    pub fn update<T>(&self, f: impl FnOnce(&mut MockState) -> Result<T>) -> Result<T> {
        let lock = self.lock_file()?;
        lock.lock_exclusive()
            .map_err(|e| StorageError::io(self.root.join(LOCK_FILE), e))?;

        let result = self.load().and_then(|mut state| {
            let value = f(&mut state)?;
            self.save(&state)?;
            Ok(value)
        });

        FileExt::unlock(&lock).map_err(|e| StorageError::io(self.root.join(LOCK_FILE), e))?;
        result
    }

    /// Delete the state file so the next read starts from the fixtures.
    pub fn reset(&self) -> Result<()> {
        let path = self.path();
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "Mock state reset");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(&path, e).into()),
        }
    }

    fn load(&self) -> Result<MockState> {
        let path = self.path();
        match fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json).map_err(|e| StorageError::corrupt(&path, e).into()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No mock state, seeding fixtures");
                MockState::seeded()
            }
            Err(e) => Err(StorageError::io(&path, e).into()),
        }
    }

    fn save(&self, state: &MockState) -> Result<()> {
        let path = self.path();
        let json = serde_json::to_string_pretty(state).map_err(|e| StorageError::corrupt(&path, e))?;

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json).map_err(|e| StorageError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| StorageError::io(&path, e))?;
        Ok(())
    }
}
