//! # Token Storage
//!
//! The session token is the only persisted client state. Its presence is the
//! sole signal that a session exists. [`FileTokenStore`] keeps it in a small
//! JSON key-value file under the `"token"` key and leaves any other keys alone.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};

use crate::api::error::StoreError;

/// Key under which the session token is stored.
pub const TOKEN_KEY: &str = "token";

/// Where the session token lives between runs.
pub trait TokenStore: Send + Sync {
    /// Current token, if any. Read failures are logged and treated as "no token".
    fn get(&self) -> Option<String>;
    fn set(&self, token: &str) -> Result<(), StoreError>;
    /// Removes the token. Removing an absent token succeeds.
    fn remove(&self) -> Result<(), StoreError>;

    fn has_token(&self) -> bool {
        self.get().is_some()
    }
}

/// Process-local store, used by tests and one-shot commands.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<String>> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.slot().clone()
    }

    fn set(&self, token: &str) -> Result<(), StoreError> {
        *self.slot() = Some(token.to_string());
        Ok(())
    }

    fn remove(&self) -> Result<(), StoreError> {
        *self.slot() = None;
        Ok(())
    }
}

/// JSON file store.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<Map<String, Value>, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if text.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(StoreError::NotAnObject(self.path.clone())),
            Err(source) => Err(StoreError::Json {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(map).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, text).map_err(io_err)
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        match self.read_map() {
            Ok(map) => map
                .get(TOKEN_KEY)
                .and_then(Value::as_str)
                .filter(|token| !token.is_empty())
                .map(str::to_string),
            Err(e) => {
                log::warn!("Ignoring unreadable token store: {}", e);
                None
            }
        }
    }

    fn set(&self, token: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.read_map()?;
        map.insert(TOKEN_KEY.to_string(), Value::String(token.to_string()));
        self.write_map(&map)?;
        log::debug!("Session token saved to {}", self.path.display());
        Ok(())
    }

    fn remove(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut map, corrupt) = match self.read_map() {
            Ok(map) => (map, false),
            // A corrupt file holds no usable token; start over.
            Err(StoreError::Json { .. }) | Err(StoreError::NotAnObject(_)) => (Map::new(), true),
            Err(e) => return Err(e),
        };
        let removed = map.remove(TOKEN_KEY).is_some();
        if removed || corrupt {
            self.write_map(&map)?;
        }
        Ok(())
    }
}
