//! Persistent Store Adapter
//!
//! A string-keyed, string-valued store with the same contract as a browser's
//! local storage: `get`/`set`/`remove`, plus key enumeration for bulk export.
//! Agents never talk to a concrete backend directly; they hold an
//! `Arc<dyn KeyValueStore>` so the host decides where data actually lives.

use crate::error::StorageError;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// The contract every storage backend fulfils.
///
/// Implementations must be atomic per key. There is no cross-key transaction
/// and concurrent `set` calls resolve as last-write-wins; read-modify-write
/// sequences on a shared key go through [`KeyValueStore::update`].
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
    /// Hands the current value of `key` to `apply` and stores what it returns,
    /// with no other writer able to touch the store in between. `Ok(None)`
    /// from `apply` leaves the key unchanged.
    fn update(&self, key: &str, apply: &mut Transform<'_>) -> Result<(), StorageError>;
    /// Lists every key currently held by the store, in sorted order.
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

pub type SharedStore = Arc<dyn KeyValueStore>;

/// The edit step of [`KeyValueStore::update`].
pub type Transform<'a> = dyn FnMut(Option<&str>) -> Result<Option<String>, StorageError> + 'a;

/// The agent family a session belongs to. Used as the key namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Advisor,
    Teacher,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Advisor => "advisor",
            Domain::Teacher => "teacher",
        }
    }
}

/// What a namespaced key holds for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySuffix {
    Memory,
    Messages,
    Artifact,
}

impl KeySuffix {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeySuffix::Memory => "memory",
            KeySuffix::Messages => "messages",
            KeySuffix::Artifact => "artifact",
        }
    }
}

/// Builds `{domain}_{session_id}_{suffix}`.
pub fn session_key(domain: Domain, session_id: &str, suffix: KeySuffix) -> String {
    format!("{}_{}_{}", domain.as_str(), session_id, suffix.as_str())
}

// --- In-memory backend ---

/// A process-local store. Used in tests and whenever a host has no durable
/// location to write to.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".into()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".into()))?;
        entries.remove(key);
        Ok(())
    }

    fn update(&self, key: &str, apply: &mut Transform<'_>) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".into()))?;
        let next = apply(entries.get(key).map(String::as_str))?;
        if let Some(next) = next {
            entries.insert(key.to_string(), next);
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".into()))?;
        Ok(entries.keys().cloned().collect())
    }
}

// --- File backend ---

/// A durable store kept as a single JSON object on disk.
///
/// Every write rewrites the whole file through a temporary sibling and an
/// atomic rename, so a crash never leaves a half-written file behind. An
/// optional byte quota mirrors the size cap of browser storage.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    quota_bytes: Option<usize>,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens (or creates) the store at `path`.
    pub fn open(path: impl Into<PathBuf>, quota_bytes: Option<usize>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            BTreeMap::new()
        };
        info!(path = %path.display(), keys = entries.len(), "File store opened");
        Ok(Self {
            path,
            quota_bytes,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let serialized = serde_json::to_string(entries)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serialized)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), keys = entries.len(), "File store flushed");
        Ok(())
    }

    fn stored_bytes(entries: &BTreeMap<String, String>) -> usize {
        entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    /// Quota check, insert and flush for a caller already holding the write lock.
    fn write_entry(
        &self,
        entries: &mut BTreeMap<String, String>,
        key: &str,
        value: String,
    ) -> Result<(), StorageError> {
        if let Some(limit) = self.quota_bytes {
            let current = Self::stored_bytes(entries);
            let replaced = entries.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
            let needed = current - replaced + key.len() + value.len();
            if needed > limit {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    limit,
                });
            }
        }

        let previous = entries.insert(key.to_string(), value);
        if let Err(e) = self.flush(entries) {
            // Keep memory and disk in agreement when the write fails.
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StorageError::Unavailable("file store lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StorageError::Unavailable("file store lock poisoned".into()))?;
        self.write_entry(&mut entries, key, value.to_string())
    }

    fn update(&self, key: &str, apply: &mut Transform<'_>) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StorageError::Unavailable("file store lock poisoned".into()))?;
        let next = apply(entries.get(key).map(String::as_str))?;
        match next {
            Some(next) => self.write_entry(&mut entries, key, next),
            None => Ok(()),
        }
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StorageError::Unavailable("file store lock poisoned".into()))?;
        if let Some(old) = entries.remove(key) {
            if let Err(e) = self.flush(&entries) {
                entries.insert(key.to_string(), old);
                return Err(e);
            }
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StorageError::Unavailable("file store lock poisoned".into()))?;
        Ok(entries.keys().cloned().collect())
    }
}
