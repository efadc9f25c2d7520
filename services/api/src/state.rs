//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the store, the
//! completion client and everything handlers need to open an agent for a
//! session.

use pathwise_core::advisor::prompt::ADVISOR_BASE_PROMPT;
use pathwise_core::advisor::{AdvisorAgent, PersonaDirectory};
use pathwise_core::learning_path::LearningPath;
use pathwise_core::llm_client::CompletionClient;
use pathwise_core::prompt_config::PromptConfigStore;
use pathwise_core::teacher::prompt::{LESSON_GUIDELINES, TEACHER_BASE_PROMPT};
use pathwise_core::teacher::{TeacherAgent, TeacherPrompts};
use pathwise_core::SharedStore;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

/// Instruction blocks the service starts from before any runtime override.
#[derive(Debug, Clone, PartialEq)]
pub struct BasePrompts {
    pub advisor: String,
    pub teacher: String,
    pub lesson_guidelines: String,
}

impl Default for BasePrompts {
    fn default() -> Self {
        Self {
            advisor: ADVISOR_BASE_PROMPT.to_string(),
            teacher: TEACHER_BASE_PROMPT.to_string(),
            lesson_guidelines: LESSON_GUIDELINES.to_string(),
        }
    }
}

fn read_prompt(dir: &Path, file: &str, fallback: String) -> String {
    let path = dir.join(file);
    match std::fs::read_to_string(&path) {
        Ok(content) if !content.trim().is_empty() => {
            info!(path = %path.display(), "Loaded prompt override");
            content
        }
        Ok(_) => fallback,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => fallback,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read prompt file; using built-in");
            fallback
        }
    }
}

impl BasePrompts {
    /// Reads the optional `*.md` overrides from `dir`. Missing files keep the
    /// built-in text.
    pub fn load(dir: &Path) -> Self {
        let defaults = Self::default();
        Self {
            advisor: read_prompt(dir, "advisor_system_prompt.md", defaults.advisor),
            teacher: read_prompt(dir, "teacher_system_prompt.md", defaults.teacher),
            lesson_guidelines: read_prompt(dir, "lesson_guidelines.md", defaults.lesson_guidelines),
        }
    }
}

type LockMap = HashMap<String, Arc<Mutex<()>>>;

/// One async lock per session id so turns on a session never interleave.
///
/// An entry lives only while a request holds or waits on it; the last
/// [`SessionGuard`] to release removes it.
#[derive(Default)]
pub struct SessionLocks {
    locks: Arc<StdMutex<LockMap>>,
}

impl SessionLocks {
    pub async fn acquire(&self, session_id: &str) -> SessionGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(session_id.to_string()).or_default().clone()
        };
        SessionGuard {
            session_id: session_id.to_string(),
            guard: Some(lock.lock_owned().await),
            locks: self.locks.clone(),
        }
    }

    /// Number of session ids currently held or waited on.
    pub fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Exclusive access to one session until dropped.
pub struct SessionGuard {
    session_id: String,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<StdMutex<LockMap>>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        // Release first so a waiter's clone is the only other reference left.
        self.guard.take();
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&self.session_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.session_id);
        }
    }
}

/// The shared application state, created once at startup and passed to all handlers.
/// All fields are public to be accessible from other modules.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub llm_client: Arc<dyn CompletionClient>,
    pub base_prompts: Arc<BasePrompts>,
    pub personas: Arc<PersonaDirectory>,
    pub locks: Arc<SessionLocks>,
    pub http: reqwest::Client,
    pub handoff_url: Option<String>,
}

impl AppState {
    pub fn new(
        store: SharedStore,
        llm_client: Arc<dyn CompletionClient>,
        base_prompts: BasePrompts,
        handoff_url: Option<String>,
    ) -> Self {
        Self {
            store,
            llm_client,
            base_prompts: Arc::new(base_prompts),
            personas: Arc::new(PersonaDirectory::builtin()),
            locks: Arc::new(SessionLocks::default()),
            http: reqwest::Client::new(),
            handoff_url,
        }
    }

    pub fn prompt_config(&self) -> PromptConfigStore {
        PromptConfigStore::new(self.store.clone())
    }

    /// A saved prompt configuration wins over the startup prompts.
    pub fn advisor_prompt(&self) -> String {
        let configs = self.prompt_config();
        if configs.is_configured() {
            configs.load().advisor_system_prompt
        } else {
            self.base_prompts.advisor.clone()
        }
    }

    pub fn teacher_prompts(&self) -> TeacherPrompts {
        let configs = self.prompt_config();
        if configs.is_configured() {
            configs.load().teacher_prompts()
        } else {
            TeacherPrompts {
                base: self.base_prompts.teacher.clone(),
                guidelines: self.base_prompts.lesson_guidelines.clone(),
            }
        }
    }

    pub fn open_advisor(&self, session_id: &str) -> AdvisorAgent {
        AdvisorAgent::with_base_prompt(
            session_id,
            self.store.clone(),
            self.llm_client.clone(),
            self.advisor_prompt(),
        )
    }

    pub fn open_teacher(&self, session_id: &str, learning_path: Option<LearningPath>) -> TeacherAgent {
        TeacherAgent::with_prompts(
            session_id,
            self.store.clone(),
            self.llm_client.clone(),
            learning_path,
            self.teacher_prompts(),
        )
    }
}
