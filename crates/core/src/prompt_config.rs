//! Editable agent prompts.
//!
//! The instruction blocks for both agents can be overridden at runtime. The
//! configuration lives under a single key and falls back to the built-in
//! prompts whenever it is missing or unreadable.

use crate::advisor::prompt::ADVISOR_BASE_PROMPT;
use crate::error::StorageError;
use crate::storage::SharedStore;
use crate::teacher::agent::TeacherPrompts;
use crate::teacher::prompt::{LESSON_GUIDELINES, TEACHER_BASE_PROMPT};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

pub const PROMPT_CONFIG_KEY: &str = "dev_prompt_config";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptConfig {
    pub teacher_system_prompt: String,
    pub advisor_system_prompt: String,
    pub lesson_generation_guidelines: String,
    pub last_updated: DateTime<Utc>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            teacher_system_prompt: TEACHER_BASE_PROMPT.to_string(),
            advisor_system_prompt: ADVISOR_BASE_PROMPT.to_string(),
            lesson_generation_guidelines: LESSON_GUIDELINES.to_string(),
            last_updated: Utc::now(),
        }
    }
}

impl PromptConfig {
    pub fn teacher_prompts(&self) -> TeacherPrompts {
        TeacherPrompts {
            base: self.teacher_system_prompt.clone(),
            guidelines: self.lesson_generation_guidelines.clone(),
        }
    }

    fn is_complete(&self) -> bool {
        !self.teacher_system_prompt.is_empty()
            && !self.advisor_system_prompt.is_empty()
            && !self.lesson_generation_guidelines.is_empty()
    }
}

/// The three prompt fields an import must carry.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptConfigImport {
    teacher_system_prompt: String,
    advisor_system_prompt: String,
    lesson_generation_guidelines: String,
}

#[derive(Clone)]
pub struct PromptConfigStore {
    store: SharedStore,
}

impl PromptConfigStore {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub fn load(&self) -> PromptConfig {
        match self.store.get(PROMPT_CONFIG_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "Prompt config is corrupt; using defaults");
                PromptConfig::default()
            }),
            Ok(None) => PromptConfig::default(),
            Err(e) => {
                error!(error = %e, "Failed to load prompt config");
                PromptConfig::default()
            }
        }
    }

    /// Whether a configuration has been saved.
    pub fn is_configured(&self) -> bool {
        matches!(self.store.get(PROMPT_CONFIG_KEY), Ok(Some(_)))
    }

    /// Stores `config`, stamping `last_updated`.
    pub fn save(&self, config: &PromptConfig) -> Result<PromptConfig, StorageError> {
        let updated = PromptConfig {
            last_updated: Utc::now(),
            ..config.clone()
        };
        self.store
            .set(PROMPT_CONFIG_KEY, &serde_json::to_string(&updated)?)?;
        Ok(updated)
    }

    pub fn reset_to_defaults(&self) -> Result<PromptConfig, StorageError> {
        self.save(&PromptConfig::default())
    }

    pub fn export(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string_pretty(&self.load())?)
    }

    /// Saves an exported configuration. Returns false when `json` is not a
    /// configuration with all three prompts filled in.
    pub fn import(&self, json: &str) -> bool {
        let incoming = match serde_json::from_str::<PromptConfigImport>(json) {
            Ok(incoming) => incoming,
            Err(e) => {
                warn!(error = %e, "Rejected prompt config import");
                return false;
            }
        };
        let config = PromptConfig {
            teacher_system_prompt: incoming.teacher_system_prompt,
            advisor_system_prompt: incoming.advisor_system_prompt,
            lesson_generation_guidelines: incoming.lesson_generation_guidelines,
            last_updated: Utc::now(),
        };
        if !config.is_complete() {
            warn!("Rejected prompt config import with empty prompts");
            return false;
        }
        match self.save(&config) {
            Ok(_) => true,
            Err(e) => {
                error!(error = %e, "Failed to save imported prompt config");
                false
            }
        }
    }
}
