//! Per-session state shared by both agents.
//!
//! A session owns exactly one memory record and one transcript and knows how
//! to round-trip both through the store under its namespaced keys. Loading
//! and saving are best-effort at this level: the agents keep working from
//! in-memory state when storage misbehaves.

use crate::error::StorageError;
use crate::storage::{Domain, KeySuffix, KeyValueStore, SharedStore, session_key};
use crate::transcript::{ChatMessage, Transcript};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, error, warn};

pub struct SessionState<M> {
    domain: Domain,
    session_id: String,
    store: SharedStore,
    pub memory: M,
    pub transcript: Transcript,
}

impl<M> SessionState<M>
where
    M: Serialize + DeserializeOwned,
{
    pub fn new(domain: Domain, session_id: impl Into<String>, store: SharedStore, memory: M) -> Self {
        Self {
            domain,
            session_id: session_id.into(),
            store,
            memory,
            transcript: Transcript::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    fn key(&self, suffix: KeySuffix) -> String {
        session_key(self.domain, &self.session_id, suffix)
    }

    /// Replaces memory and transcript with whatever the store holds.
    ///
    /// Each half is loaded independently; a missing or corrupt entry leaves
    /// the current value in place and is logged.
    pub fn load(&mut self) {
        let memory_key = self.key(KeySuffix::Memory);
        match self.store.get(&memory_key) {
            Ok(Some(raw)) => match serde_json::from_str::<M>(&raw) {
                Ok(memory) => self.memory = memory,
                Err(e) => warn!(key = %memory_key, error = %e, "Stored memory is corrupt; starting fresh"),
            },
            Ok(None) => debug!(key = %memory_key, "No stored memory"),
            Err(e) => error!(key = %memory_key, error = %e, "Failed to read memory from store"),
        }

        let messages_key = self.key(KeySuffix::Messages);
        match self.store.get(&messages_key) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<ChatMessage>>(&raw) {
                Ok(messages) => self.transcript = Transcript::from_messages(messages),
                Err(e) => warn!(key = %messages_key, error = %e, "Stored transcript is corrupt; starting fresh"),
            },
            Ok(None) => debug!(key = %messages_key, "No stored transcript"),
            Err(e) => error!(key = %messages_key, error = %e, "Failed to read transcript from store"),
        }
    }

    /// Writes memory then transcript.
    pub fn save(&self) -> Result<(), StorageError> {
        let memory = serde_json::to_string(&self.memory)?;
        let messages = serde_json::to_string(self.transcript.messages())?;
        self.store.set(&self.key(KeySuffix::Memory), &memory)?;
        self.store.set(&self.key(KeySuffix::Messages), &messages)?;
        Ok(())
    }

    /// [`SessionState::save`], with failures logged instead of returned.
    ///
    /// Returns whether the write succeeded.
    pub fn persist(&self) -> bool {
        match self.save() {
            Ok(()) => true,
            Err(e) => {
                error!(session_id = %self.session_id, domain = self.domain.as_str(), error = %e, "Failed to persist session; continuing in memory");
                false
            }
        }
    }

    /// Removes both stored halves of a session.
    pub fn clear(store: &dyn KeyValueStore, domain: Domain, session_id: &str) -> Result<(), StorageError> {
        store.remove(&session_key(domain, session_id, KeySuffix::Memory))?;
        store.remove(&session_key(domain, session_id, KeySuffix::Messages))?;
        Ok(())
    }
}
