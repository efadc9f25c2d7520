//! The teacher facade.
//!
//! Walks a learner through a loaded path. Every reply is a structured
//! [`TeacherResponse`]; the serialized response is what goes into the
//! transcript, so the model sees its own earlier lessons verbatim.

use crate::error::{AgentError, CompletionError, StorageError};
use crate::learning_path::LearningPath;
use crate::llm_client::{
    CompletionClient, CompletionOptions, CompletionRequest, ResponseFormat, complete_json,
};
use crate::registry::TeacherRegistry;
use crate::session::SessionState;
use crate::storage::{Domain, SharedStore};
use crate::teacher::memory::{FeedbackUpdate, Progress, TeacherMemory};
use crate::teacher::prompt::{
    LESSON_GUIDELINES, TEACHER_BASE_PROMPT, build_system_prompt, welcome_message,
};
use crate::transcript::ChatMessage;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub title: String,
    pub content: String,
    pub examples: Vec<String>,
    pub key_takeaways: Vec<String>,
    pub question: QuizQuestion,
}

/// A teacher reply: plain guidance, or a lesson ending in a quiz question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TeacherResponse {
    Text { content: String },
    Lesson(Lesson),
}

impl TeacherResponse {
    pub fn content(&self) -> &str {
        match self {
            TeacherResponse::Text { content } => content,
            TeacherResponse::Lesson(lesson) => &lesson.content,
        }
    }
}

/// Strict schema for the `teacher_response` structured reply.
pub fn teacher_response_schema() -> Value {
    let strings = json!({ "type": "array", "items": { "type": "string" } });
    json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "type": { "type": "string", "enum": ["text", "lesson"] },
            "content": { "type": "string" },
            "title": { "type": "string" },
            "examples": strings,
            "keyTakeaways": strings,
            "question": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "id": { "type": "string" },
                    "question": { "type": "string" },
                    "options": strings,
                    "correctAnswer": { "type": "string" },
                    "explanation": { "type": "string" }
                },
                "required": ["id", "question", "options", "correctAnswer", "explanation"]
            }
        },
        "required": ["type", "content", "title", "examples", "keyTakeaways", "question"]
    })
}

/// The instruction text wrapped around the live context.
#[derive(Debug, Clone)]
pub struct TeacherPrompts {
    pub base: String,
    pub guidelines: String,
}

impl Default for TeacherPrompts {
    fn default() -> Self {
        Self {
            base: TEACHER_BASE_PROMPT.to_string(),
            guidelines: LESSON_GUIDELINES.to_string(),
        }
    }
}

pub struct TeacherAgent {
    state: SessionState<TeacherMemory>,
    client: Arc<dyn CompletionClient>,
    registry: TeacherRegistry,
    prompts: TeacherPrompts,
}

impl TeacherAgent {
    pub fn new(
        session_id: impl Into<String>,
        store: SharedStore,
        client: Arc<dyn CompletionClient>,
        learning_path: Option<LearningPath>,
    ) -> Self {
        Self::with_prompts(session_id, store, client, learning_path, TeacherPrompts::default())
    }

    /// Opens `session_id`. Stored memory takes precedence over `learning_path`.
    pub fn with_prompts(
        session_id: impl Into<String>,
        store: SharedStore,
        client: Arc<dyn CompletionClient>,
        learning_path: Option<LearningPath>,
        prompts: TeacherPrompts,
    ) -> Self {
        let mut state = SessionState::new(
            Domain::Teacher,
            session_id,
            store.clone(),
            TeacherMemory::new(learning_path),
        );
        state.load();

        let mut agent = Self {
            state,
            client,
            registry: TeacherRegistry::new(store),
            prompts,
        };
        if agent.state.transcript.is_empty() {
            agent.refresh_system_prompt();
            let welcome = welcome_message(&agent.state.memory);
            agent.state.transcript.push(ChatMessage::assistant(welcome));
        }
        agent
    }

    pub fn session_id(&self) -> &str {
        self.state.session_id()
    }

    pub fn memory(&self) -> &TeacherMemory {
        &self.state.memory
    }

    /// The conversation without the system message.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state.transcript.visible()
    }

    pub fn progress(&self) -> Progress {
        self.state.memory.progress()
    }

    fn refresh_system_prompt(&mut self) {
        let prompt = build_system_prompt(
            &self.prompts.base,
            &self.prompts.guidelines,
            &self.state.memory,
        );
        self.state.transcript.refresh_system(prompt);
    }

    /// Runs one teaching turn.
    pub async fn respond(&mut self, user_text: &str) -> Result<TeacherResponse, AgentError> {
        self.state.transcript.push(ChatMessage::user(user_text));
        self.refresh_system_prompt();

        let request = CompletionRequest::new(
            self.state.transcript.messages().to_vec(),
            CompletionOptions::LESSON,
        )
        .with_schema(ResponseFormat::json_schema("teacher_response", teacher_response_schema()));

        let response: TeacherResponse = complete_json(self.client.as_ref(), request)
            .await
            .inspect_err(|e| error!(session_id = %self.state.session_id(), error = %e, "Teacher response failed"))?;

        let stored = serde_json::to_string(&response).map_err(CompletionError::from)?;
        self.state.transcript.push(ChatMessage::assistant(stored));
        self.persist();
        Ok(response)
    }

    /// Installs `path` and restarts progress from its first course.
    pub fn set_learning_path(&mut self, path: LearningPath) -> Result<(), AgentError> {
        path.validate().map_err(AgentError::InvalidLearningPath)?;
        info!(session_id = %self.state.session_id(), path_id = %path.id, "Loading learning path");
        self.state.memory.start_path(path, Utc::now());
        self.refresh_system_prompt();
        self.persist();
        Ok(())
    }

    /// Completes the current course and advances the cursor.
    pub fn mark_complete(&mut self) -> Result<Progress, AgentError> {
        if self.state.memory.learning_path.is_none() {
            return Err(AgentError::NoLearningPath);
        }
        let moved = self.state.memory.mark_complete();
        let progress = self.progress();
        info!(
            session_id = %self.state.session_id(),
            moved,
            completed = progress.completed_count,
            total = progress.total_courses,
            "Marked course complete"
        );
        self.refresh_system_prompt();
        self.persist();
        Ok(progress)
    }

    pub fn set_feedback(&mut self, update: &FeedbackUpdate) {
        self.state.memory.user_feedback.apply(update);
        self.refresh_system_prompt();
        self.persist();
    }

    /// Saves the session and refreshes its registry entry.
    fn persist(&self) {
        if !self.state.persist() {
            return;
        }
        if let Err(e) = self
            .registry
            .update(self.state.session_id(), &self.state.memory)
        {
            warn!(session_id = %self.state.session_id(), error = %e, "Failed to update teacher registry");
        }
    }

    /// Removes the stored session and its registry entry.
    pub fn clear_session(store: &SharedStore, session_id: &str) -> Result<(), StorageError> {
        SessionState::<TeacherMemory>::clear(store.as_ref(), Domain::Teacher, session_id)?;
        TeacherRegistry::new(store.clone()).remove(session_id)
    }
}
