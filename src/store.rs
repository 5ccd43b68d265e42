//! Credential persistence
//!
//! The client keeps a handful of string values (token and user identity)
//! between launches. Platform keychains are out of scope; anything that can
//! save, load and delete strings by key can back a [`CredentialStore`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use crate::error::{Error, Result};

/// Key of the bearer token
pub const TOKEN_KEY: &str = "jwt_token";
/// Key of the numeric user id
pub const USER_ID_KEY: &str = "user_id";
/// Key of the display name
pub const USER_NAME_KEY: &str = "user_name";
/// Key of the optional email
pub const USER_EMAIL_KEY: &str = "user_email";
/// Key of the guest flag (`"true"` / `"false"`)
pub const GUEST_KEY: &str = "is_guest";

/// Every key the session writes; `clear_all` removes exactly these.
pub const SESSION_KEYS: [&str; 5] = [TOKEN_KEY, USER_ID_KEY, USER_NAME_KEY, USER_EMAIL_KEY, GUEST_KEY];

/// String key-value store for credentials
pub trait CredentialStore: Send + Sync {
    /// Save `value` under `key`, replacing any previous value
    fn save(&self, key: &str, value: &str) -> Result<()>;

    /// Load the value under `key`
    fn load(&self, key: &str) -> Option<String>;

    /// Remove `key` if present
    fn delete(&self, key: &str);

    /// Remove every session key
    fn clear_all(&self) {
        for key in SESSION_KEYS {
            self.delete(key);
        }
    }
}

/// In-process store; contents are lost when dropped
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn load(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn delete(&self, key: &str) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

/// Store persisted as a JSON object in a single file
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    values: RwLock<HashMap<String, String>>,
}

impl FileCredentialStore {
    /// Open the store at `path`, loading existing contents if the file exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => HashMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(Error::store(format!("cannot read {}: {}", path.display(), e))),
        };
        debug!("Opened credential file {}", path.display());
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    fn persist(&self, values: &HashMap<String, String>) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(values)?;
        std::fs::write(&self.path, bytes)
            .map_err(|e| Error::store(format!("cannot write {}: {}", self.path.display(), e)))
    }
}

impl CredentialStore for FileCredentialStore {
    fn save(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        self.persist(&values)
    }

    fn load(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn delete(&self, key: &str) {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        if values.remove(key).is_some() {
            if let Err(e) = self.persist(&values) {
                tracing::warn!("Failed to persist deletion of {}: {}", key, e);
            }
        }
    }
}
