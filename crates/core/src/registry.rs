//! Session registries.
//!
//! Each registry is a JSON array stored under one well-known key. They are
//! indexes for listing and resuming sessions; the per-session memory keys stay
//! the source of truth. A corrupt or unreadable registry reads as empty.
//! Every edit runs through [`KeyValueStore::update`](crate::storage::KeyValueStore::update)
//! so sessions written concurrently never drop each other's entries.

use crate::advisor::memory::AdvisorMemory;
use crate::error::StorageError;
use crate::learning_path::LearningPath;
use crate::storage::SharedStore;
use crate::teacher::memory::TeacherMemory;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

pub const ADVISOR_REGISTRY_KEY: &str = "learning_agent_sessions";
pub const TEACHER_REGISTRY_KEY: &str = "teacher_sessions";

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// `{prefix}_{unix millis}_{9 random base36 chars}`.
pub fn generate_id(prefix: &str) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..9)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("{prefix}_{}_{suffix}", Utc::now().timestamp_millis())
}

pub fn generate_advisor_session_id() -> String {
    generate_id("session")
}

pub fn generate_teacher_session_id() -> String {
    generate_id("teacher")
}

fn parse_list<T: DeserializeOwned>(key: &str, raw: Option<&str>) -> Vec<T> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!(key, error = %e, "Registry is corrupt; treating as empty");
        Vec::new()
    })
}

fn read_list<T: DeserializeOwned>(store: &SharedStore, key: &str) -> Vec<T> {
    match store.get(key) {
        Ok(raw) => parse_list(key, raw.as_deref()),
        Err(e) => {
            warn!(key, error = %e, "Failed to read registry");
            Vec::new()
        }
    }
}

/// Applies `edit` to the stored list in one atomic store update. Nothing is
/// written when `edit` returns `false`.
fn edit_list<T, F>(store: &SharedStore, key: &str, edit: F) -> Result<(), StorageError>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce(&mut Vec<T>) -> bool,
{
    let mut edit = Some(edit);
    store.update(key, &mut |raw| {
        let mut items: Vec<T> = parse_list(key, raw);
        let changed = edit.take().is_some_and(|edit| edit(&mut items));
        if !changed {
            return Ok(None);
        }
        Ok(Some(serde_json::to_string(&items)?))
    })
}

// --- Advisor sessions ---

/// Derived snapshot of an advisor session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub objective: Option<String>,
    pub skill_level: Option<String>,
    pub skills: Vec<String>,
    pub learning_path_created: bool,
}

#[derive(Clone)]
pub struct SessionRegistry {
    store: SharedStore,
}

impl SessionRegistry {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Every summary, most recently updated first.
    pub fn all(&self) -> Vec<SessionSummary> {
        let mut sessions: Vec<SessionSummary> = read_list(&self.store, ADVISOR_REGISTRY_KEY);
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        sessions
    }

    pub fn most_recent(&self) -> Option<SessionSummary> {
        self.all().into_iter().next()
    }

    pub fn get(&self, session_id: &str) -> Option<SessionSummary> {
        self.all().into_iter().find(|s| s.session_id == session_id)
    }

    pub fn len(&self) -> usize {
        self.all().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Refreshes the summary for `session_id` from `memory`, keeping its
    /// original creation time.
    pub fn upsert(&self, session_id: &str, memory: &AdvisorMemory) -> Result<(), StorageError> {
        self.upsert_at(session_id, memory, Utc::now())
    }

    fn upsert_at(
        &self,
        session_id: &str,
        memory: &AdvisorMemory,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut summary = SessionSummary {
            session_id: session_id.to_string(),
            created_at: now,
            updated_at: now,
            objective: memory.objective.clone(),
            skill_level: memory.skill_level.clone(),
            skills: memory.relevant_skills.clone(),
            learning_path_created: memory.learning_path_created,
        };
        edit_list(&self.store, ADVISOR_REGISTRY_KEY, |sessions: &mut Vec<SessionSummary>| {
            match sessions.iter_mut().find(|s| s.session_id == session_id) {
                Some(existing) => {
                    summary.created_at = existing.created_at;
                    *existing = summary;
                }
                None => sessions.push(summary),
            }
            true
        })?;
        debug!(session_id, "Updated advisor session registry");
        Ok(())
    }

    pub fn remove(&self, session_id: &str) -> Result<(), StorageError> {
        edit_list(&self.store, ADVISOR_REGISTRY_KEY, |sessions: &mut Vec<SessionSummary>| {
            let before = sessions.len();
            sessions.retain(|s| s.session_id != session_id);
            sessions.len() != before
        })
    }
}

// --- Teacher sessions ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherSession {
    pub session_id: String,
    pub learning_path: LearningPath,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub memory: TeacherMemory,
}

#[derive(Clone)]
pub struct TeacherRegistry {
    store: SharedStore,
}

impl TeacherRegistry {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub fn all(&self) -> Vec<TeacherSession> {
        let mut sessions: Vec<TeacherSession> = read_list(&self.store, TEACHER_REGISTRY_KEY);
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        sessions
    }

    pub fn get(&self, session_id: &str) -> Option<TeacherSession> {
        self.all().into_iter().find(|s| s.session_id == session_id)
    }

    pub fn len(&self) -> usize {
        self.all().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registers a fresh session for `path` and returns its id.
    pub fn create_session(&self, path: LearningPath) -> Result<String, StorageError> {
        let session_id = generate_teacher_session_id();
        let now = Utc::now();
        let mut memory = TeacherMemory::default();
        memory.start_path(path.clone(), now);

        let session = TeacherSession {
            session_id: session_id.clone(),
            learning_path: path,
            created_at: now,
            updated_at: now,
            memory,
        };
        edit_list(&self.store, TEACHER_REGISTRY_KEY, |sessions: &mut Vec<TeacherSession>| {
            sessions.push(session);
            true
        })?;
        debug!(session_id = %session_id, "Registered teacher session");
        Ok(session_id)
    }

    /// Replaces the stored memory snapshot. Unknown ids are ignored.
    pub fn update(&self, session_id: &str, memory: &TeacherMemory) -> Result<(), StorageError> {
        edit_list(&self.store, TEACHER_REGISTRY_KEY, |sessions: &mut Vec<TeacherSession>| {
            let Some(session) = sessions.iter_mut().find(|s| s.session_id == session_id) else {
                debug!(session_id, "Teacher session not registered; skipping update");
                return false;
            };
            session.memory = memory.clone();
            if let Some(path) = &memory.learning_path {
                session.learning_path = path.clone();
            }
            session.updated_at = Utc::now();
            true
        })
    }

    pub fn remove(&self, session_id: &str) -> Result<(), StorageError> {
        edit_list(&self.store, TEACHER_REGISTRY_KEY, |sessions: &mut Vec<TeacherSession>| {
            let before = sessions.len();
            sessions.retain(|s| s.session_id != session_id);
            sessions.len() != before
        })
    }
}
