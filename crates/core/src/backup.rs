//! Bulk export and import.
//!
//! An export is a versioned snapshot of every key the application owns: the
//! two registries, the prompt configuration, and every session-prefixed key.
//! Stored values that are JSON documents are embedded as JSON, everything else
//! as a string, so a replace-import onto a cleared store reproduces the exact
//! key/value set.

use crate::error::{BackupError, StorageError};
use crate::prompt_config::PROMPT_CONFIG_KEY;
use crate::registry::{ADVISOR_REGISTRY_KEY, TEACHER_REGISTRY_KEY};
use crate::storage::SharedStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

pub const STORAGE_VERSION: &str = "1.0.0";

pub const KNOWN_KEYS: [&str; 3] = [ADVISOR_REGISTRY_KEY, TEACHER_REGISTRY_KEY, PROMPT_CONFIG_KEY];

/// Prefixes of per-session keys. The last two are the legacy layout.
pub const SESSION_PREFIXES: [&str; 4] = ["advisor_", "teacher_", "learning_agent_", "teacher_agent_"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageExport {
    pub version: String,
    pub export_date: DateTime<Utc>,
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Imported keys overwrite; everything else stays.
    Merge,
    /// The store is cleared before importing.
    Replace,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageSummary {
    pub total_keys: usize,
    pub advisor_sessions: usize,
    pub teacher_sessions: usize,
    pub has_prompt_config: bool,
    pub storage_size: usize,
}

fn is_owned_key(key: &str) -> bool {
    KNOWN_KEYS.contains(&key) || SESSION_PREFIXES.iter().any(|p| key.starts_with(p))
}

/// Embeds `raw` as JSON only when that loses nothing on the way back.
fn embed(raw: String) -> Value {
    match serde_json::from_str::<Value>(&raw) {
        Ok(value @ (Value::Object(_) | Value::Array(_)))
            if serde_json::to_string(&value).is_ok_and(|s| s == raw) =>
        {
            value
        }
        _ => Value::String(raw),
    }
}

fn restore(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn count_sessions(keys: &[String], prefix: &str) -> usize {
    keys.iter()
        .filter(|k| k.starts_with(prefix) && k.ends_with("_memory"))
        .count()
}

fn registry_len(store: &SharedStore, key: &str) -> usize {
    match store.get(key) {
        Ok(Some(raw)) => serde_json::from_str::<Vec<Value>>(&raw)
            .map(|v| v.len())
            .unwrap_or(0),
        _ => 0,
    }
}

#[derive(Clone)]
pub struct StorageManager {
    store: SharedStore,
}

impl StorageManager {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    fn owned_keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self
            .store
            .keys()?
            .into_iter()
            .filter(|k| is_owned_key(k))
            .collect())
    }

    pub fn snapshot(&self) -> Result<StorageExport, StorageError> {
        let mut data = Map::new();
        for key in self.owned_keys()? {
            if let Some(raw) = self.store.get(&key)? {
                data.insert(key, embed(raw));
            }
        }
        Ok(StorageExport {
            version: STORAGE_VERSION.to_string(),
            export_date: Utc::now(),
            data,
        })
    }

    /// The snapshot as pretty-printed JSON.
    pub fn export_all(&self) -> Result<String, BackupError> {
        let snapshot = self.snapshot()?;
        info!(keys = snapshot.data.len(), "Exported storage");
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    /// Imports an export document and returns how many keys were written.
    ///
    /// The document is fully validated before anything is touched. A key that
    /// fails to write is logged and skipped.
    pub fn import_all(&self, json: &str, mode: ImportMode) -> Result<usize, BackupError> {
        let document: Value = serde_json::from_str(json)?;
        let version = match document.get("version") {
            Some(Value::String(v)) if !v.is_empty() => v.clone(),
            _ => return Err(BackupError::InvalidFormat("missing version".into())),
        };
        let Some(Value::Object(data)) = document.get("data") else {
            return Err(BackupError::InvalidFormat("missing data".into()));
        };
        if version != STORAGE_VERSION {
            warn!(version = %version, current = STORAGE_VERSION, "Import version differs from current");
        }

        if mode == ImportMode::Replace {
            self.clear_all()?;
        }

        let mut imported = 0;
        for (key, value) in data {
            match self.store.set(key, &restore(value)) {
                Ok(()) => imported += 1,
                Err(e) => error!(key = %key, error = %e, "Failed to import key"),
            }
        }
        info!(imported, ?mode, "Imported storage");
        Ok(imported)
    }

    /// Removes every key the application owns.
    pub fn clear_all(&self) -> Result<(), StorageError> {
        let keys = self.owned_keys()?;
        for key in &keys {
            self.store.remove(key)?;
        }
        info!(removed = keys.len(), "Cleared storage");
        Ok(())
    }

    pub fn summary(&self) -> Result<StorageSummary, StorageError> {
        let keys = self.store.keys()?;
        let mut storage_size = 0;
        for key in &keys {
            if let Some(value) = self.store.get(key)? {
                storage_size += value.len();
            }
        }

        Ok(StorageSummary {
            total_keys: keys.len(),
            advisor_sessions: count_sessions(&keys, "advisor_")
                .max(registry_len(&self.store, ADVISOR_REGISTRY_KEY)),
            teacher_sessions: count_sessions(&keys, "teacher_")
                .max(registry_len(&self.store, TEACHER_REGISTRY_KEY)),
            has_prompt_config: keys.iter().any(|k| k == PROMPT_CONFIG_KEY),
            storage_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn seeded() -> SharedStore {
        let store: SharedStore = Arc::new(MemoryStore::new());
        store.set("advisor_s1_memory", r#"{"objective":"x","skills":[]}"#).unwrap();
        store.set("advisor_s1_messages", r#"[{"role":"user","content":"hi"}]"#).unwrap();
        store.set("teacher_t1_memory", "{\n  \"pretty\": true\n}").unwrap();
        store.set(ADVISOR_REGISTRY_KEY, "[]").unwrap();
        store.set(PROMPT_CONFIG_KEY, "plain text").unwrap();
        store.set("unrelated", "keep me").unwrap();
        store
    }

    fn contents(store: &SharedStore) -> BTreeMap<String, String> {
        store
            .keys()
            .unwrap()
            .into_iter()
            .map(|k| {
                let v = store.get(&k).unwrap().unwrap();
                (k, v)
            })
            .collect()
    }

    #[test]
    fn test_export_embeds_json_and_keeps_strings() {
        let manager = StorageManager::new(seeded());
        let snapshot = manager.snapshot().unwrap();
        assert_eq!(snapshot.version, STORAGE_VERSION);
        assert!(snapshot.data["advisor_s1_memory"].is_object());
        assert!(snapshot.data["advisor_s1_messages"].is_array());
        assert!(snapshot.data["teacher_t1_memory"].is_string());
        assert_eq!(snapshot.data[PROMPT_CONFIG_KEY], "plain text");
        assert!(!snapshot.data.contains_key("unrelated"));
    }

    #[test]
    fn test_replace_import_reproduces_store() {
        let source = seeded();
        let exported = StorageManager::new(source.clone()).export_all().unwrap();
        source.remove("unrelated").unwrap();

        let target: SharedStore = Arc::new(MemoryStore::new());
        target.set("advisor_stale_memory", "{}").unwrap();
        let imported = StorageManager::new(target.clone())
            .import_all(&exported, ImportMode::Replace)
            .unwrap();

        assert_eq!(imported, 5);
        assert_eq!(contents(&target), contents(&source));
    }

    #[test]
    fn test_merge_keeps_other_keys_and_imported_wins() {
        let target: SharedStore = Arc::new(MemoryStore::new());
        target.set("advisor_s1_memory", "old").unwrap();
        target.set("advisor_s2_memory", "other").unwrap();
        let doc = r#"{"version": "1.0.0", "exportDate": "2026-01-01T00:00:00Z", "data": {"advisor_s1_memory": {"a": 1}}}"#;

        let imported = StorageManager::new(target.clone())
            .import_all(doc, ImportMode::Merge)
            .unwrap();
        assert_eq!(imported, 1);
        assert_eq!(target.get("advisor_s1_memory").unwrap().unwrap(), r#"{"a":1}"#);
        assert_eq!(target.get("advisor_s2_memory").unwrap().unwrap(), "other");
    }

    #[test]
    fn test_invalid_document_mutates_nothing() {
        let store = seeded();
        let before = contents(&store);
        let manager = StorageManager::new(store.clone());

        assert!(matches!(
            manager.import_all(r#"{"data": {}}"#, ImportMode::Replace),
            Err(BackupError::InvalidFormat(_))
        ));
        assert!(matches!(
            manager.import_all(r#"{"version": "1.0.0"}"#, ImportMode::Replace),
            Err(BackupError::InvalidFormat(_))
        ));
        assert!(matches!(
            manager.import_all("{", ImportMode::Replace),
            Err(BackupError::Parse(_))
        ));
        assert_eq!(contents(&store), before);
    }

    #[test]
    fn test_clear_all_leaves_foreign_keys() {
        let store = seeded();
        StorageManager::new(store.clone()).clear_all().unwrap();
        assert_eq!(store.keys().unwrap(), vec!["unrelated".to_string()]);
    }

    #[test]
    fn test_summary_counts_sessions() {
        let store = seeded();
        store
            .set(TEACHER_REGISTRY_KEY, r#"[{"sessionId": "a"}, {"sessionId": "b"}]"#)
            .unwrap();
        let summary = StorageManager::new(store).summary().unwrap();
        assert_eq!(summary.total_keys, 7);
        assert_eq!(summary.advisor_sessions, 1);
        assert_eq!(summary.teacher_sessions, 2);
        assert!(summary.has_prompt_config);
        assert!(summary.storage_size > 0);
    }
}
