//! Key-value persistence for engine state that outlives a session.
//!
//! Values are stored as JSON text under string keys. The engine persists the
//! rotation enabled flag, the selection history and the favorites list; a
//! corrupt or missing value always degrades to the caller's default.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::PersistenceError;

/// Prefix applied to every key in shared stores.
pub const KEY_PREFIX: &str = "panel_rotation.";

/// Raw string store. Object safe so hosts can hand in `Rc<dyn Persistence>`.
pub trait Persistence {
    fn load_raw(&self, key: &str) -> Option<String>;

    fn save_raw(&self, key: &str, value: String) -> Result<(), PersistenceError>;

    fn delete(&self, key: &str) -> Result<(), PersistenceError>;

    fn has_key(&self, key: &str) -> bool;
}

/// Typed JSON helpers over any [`Persistence`].
pub trait PersistenceExt: Persistence {
    /// Load and decode `key`, falling back to `default` when the key is
    /// missing, empty or undecodable.
    fn load<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let Some(raw) = self.load_raw(key) else {
            return default;
        };
        if raw.trim().is_empty() {
            return default;
        }
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key, error = %err, "stored value is unreadable; using default");
                default
            }
        }
    }

    fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(value).map_err(|source| PersistenceError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.save_raw(key, json)
    }
}

impl<P: Persistence + ?Sized> PersistenceExt for P {}

// =============================================================================
// In-memory store
// =============================================================================

/// Process-local store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RefCell<BTreeMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }
}

impl Persistence for MemoryStore {
    fn load_raw(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    fn save_raw(&self, key: &str, value: String) -> Result<(), PersistenceError> {
        self.values.borrow_mut().insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), PersistenceError> {
        self.values.borrow_mut().remove(key);
        Ok(())
    }

    fn has_key(&self, key: &str) -> bool {
        self.values.borrow().contains_key(key)
    }
}

// =============================================================================
// JSON file store
// =============================================================================

/// Store backed by a single JSON object file.
///
/// Every write rewrites the whole file through a sibling temp file and a
/// rename, so a crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: RefCell<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Open (or lazily create) the store at `path`.
    ///
    /// A missing file is an empty store. A file that is not a JSON object of
    /// strings is reported as [`PersistenceError::Corrupt`].
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text)
                .map_err(|_| PersistenceError::Corrupt(path.display().to_string()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(PersistenceError::ReadFailed {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        tracing::debug!(path = %path.display(), keys = values.len(), "opened settings store");
        Ok(Self {
            path,
            values: RefCell::new(values),
        })
    }

    /// Default store location under the platform data directory.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("panel-rotation")
            .join("state.json")
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn full_key(key: &str) -> String {
        format!("{KEY_PREFIX}{key}")
    }

    fn flush(&self) -> Result<(), PersistenceError> {
        let write_err = |source| PersistenceError::WriteFailed {
            path: self.path.display().to_string(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(write_err)?;
            }
        }
        let json = serde_json::to_string_pretty(&*self.values.borrow()).map_err(|source| {
            PersistenceError::Encode {
                key: "*".to_string(),
                source,
            }
        })?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(write_err)?;
        std::fs::rename(&tmp, &self.path).map_err(write_err)
    }
}

impl Persistence for JsonFileStore {
    fn load_raw(&self, key: &str) -> Option<String> {
        self.values.borrow().get(&Self::full_key(key)).cloned()
    }

    fn save_raw(&self, key: &str, value: String) -> Result<(), PersistenceError> {
        self.values.borrow_mut().insert(Self::full_key(key), value);
        self.flush()
    }

    fn delete(&self, key: &str) -> Result<(), PersistenceError> {
        let removed = self.values.borrow_mut().remove(&Self::full_key(key));
        if removed.is_some() {
            self.flush()?;
        }
        Ok(())
    }

    fn has_key(&self, key: &str) -> bool {
        self.values.borrow().contains_key(&Self::full_key(key))
    }
}
