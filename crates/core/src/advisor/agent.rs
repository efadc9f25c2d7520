//! The advisor facade.
//!
//! `AdvisorAgent` binds one session's memory and transcript to a completion
//! client and runs the turn pipeline:
//!
//! user-append → prompt-refresh → primary call → assistant-append →
//! extraction → scheduling → persistence.
//!
//! Only the primary call can fail a turn. Extraction and storage problems are
//! logged and the turn carries on with whatever state it has.

use crate::advisor::actions::{ActionRecord, ActionScheduler};
use crate::advisor::extraction::ProfileExtractor;
use crate::advisor::memory::AdvisorMemory;
use crate::advisor::persona::{Persona, PersonaDirectory};
use crate::advisor::prompt::{
    ADVISOR_BASE_PROMPT, ADVISOR_WELCOME_MESSAGE, build_system_prompt, path_generation_messages,
};
use crate::error::{AgentError, StorageError};
use crate::learning_path::{CreatedBy, LearningPath, LearningPathDraft, learning_path_schema};
use crate::llm_client::{
    CompletionClient, CompletionOptions, CompletionRequest, ResponseFormat, complete_json,
};
use crate::registry::{SessionRegistry, generate_id};
use crate::session::SessionState;
use crate::storage::{Domain, KeySuffix, SharedStore, session_key};
use crate::transcript::ChatMessage;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct AdvisorAgent {
    state: SessionState<AdvisorMemory>,
    client: Arc<dyn CompletionClient>,
    extractor: ProfileExtractor,
    scheduler: ActionScheduler,
    registry: SessionRegistry,
    base_prompt: String,
}

impl AdvisorAgent {
    /// Opens `session_id` with the built-in instruction block.
    pub fn new(session_id: impl Into<String>, store: SharedStore, client: Arc<dyn CompletionClient>) -> Self {
        Self::with_base_prompt(session_id, store, client, ADVISOR_BASE_PROMPT)
    }

    /// Opens `session_id`, loading whatever the store holds for it.
    ///
    /// A session with no stored transcript is seeded with the system prompt
    /// and the welcome message. Nothing is written until the first turn.
    pub fn with_base_prompt(
        session_id: impl Into<String>,
        store: SharedStore,
        client: Arc<dyn CompletionClient>,
        base_prompt: impl Into<String>,
    ) -> Self {
        let mut state = SessionState::new(Domain::Advisor, session_id, store.clone(), AdvisorMemory::new());
        state.load();

        let mut agent = Self {
            state,
            extractor: ProfileExtractor::new(client.clone()),
            client,
            scheduler: ActionScheduler::default(),
            registry: SessionRegistry::new(store),
            base_prompt: base_prompt.into(),
        };

        if agent.state.transcript.is_empty() {
            agent.refresh_system_prompt();
            agent
                .state
                .transcript
                .push(ChatMessage::assistant(ADVISOR_WELCOME_MESSAGE));
        }
        agent
    }

    /// Replaces the default scheduler, e.g. to swap the artifact locator.
    pub fn with_scheduler(mut self, scheduler: ActionScheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn session_id(&self) -> &str {
        self.state.session_id()
    }

    pub fn memory(&self) -> &AdvisorMemory {
        &self.state.memory
    }

    /// The full transcript, system message included.
    pub fn messages(&self) -> &[ChatMessage] {
        self.state.transcript.messages()
    }

    pub fn pending_actions(&self) -> &[ActionRecord] {
        self.scheduler.pending()
    }

    pub fn clear_pending_actions(&mut self) {
        self.scheduler.clear();
    }

    /// The last message of a resumed session, or the welcome text.
    pub fn initial_message(&self) -> String {
        let messages = self.messages();
        match messages.last() {
            Some(last) if messages.len() > 1 => last.content.clone(),
            _ => ADVISOR_WELCOME_MESSAGE.to_string(),
        }
    }

    fn refresh_system_prompt(&mut self) {
        let prompt = build_system_prompt(&self.base_prompt, &self.state.memory);
        self.state.transcript.refresh_system(prompt);
    }

    /// Runs one conversational turn and returns the assistant's reply.
    pub async fn respond(&mut self, user_text: &str) -> Result<String, AgentError> {
        let session_id = self.state.session_id().to_string();
        self.state.transcript.push(ChatMessage::user(user_text));
        self.refresh_system_prompt();

        let request = CompletionRequest::new(
            self.state.transcript.messages().to_vec(),
            CompletionOptions::CONVERSATION,
        );
        let reply = match self.client.complete(request).await {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(session_id = %session_id, error = %e, "Primary completion failed");
                return Err(e.into());
            }
        };
        self.state
            .transcript
            .push(ChatMessage::assistant(reply.clone()));

        match self.extractor.extract(user_text, Some(&reply)).await {
            Ok(data) => {
                if self.state.memory.merge_extraction(&data) {
                    debug!(session_id = %session_id, "Memory updated from extraction");
                }
            }
            Err(e) => warn!(session_id = %session_id, error = %e, "Extraction failed; memory unchanged"),
        }

        self.scheduler
            .schedule(&mut self.state.memory, &self.state.transcript, &session_id);
        self.persist();

        Ok(reply)
    }

    /// Asks the model for a structured path built from memory.
    ///
    /// The path is recorded in memory, which marks the learning path as
    /// created and lets the scheduler emit the hand-off actions with the
    /// structured payload.
    pub async fn generate_learning_path(&mut self) -> Result<LearningPath, AgentError> {
        let session_id = self.state.session_id().to_string();
        let request = CompletionRequest::new(
            path_generation_messages(&self.state.memory),
            CompletionOptions::PATH_GENERATION,
        )
        .with_schema(ResponseFormat::json_schema("learning_path", learning_path_schema()));

        let draft: LearningPathDraft = complete_json(self.client.as_ref(), request)
            .await
            .inspect_err(|e| error!(session_id = %session_id, error = %e, "Path generation failed"))?;

        let path = draft.into_path(&generate_id("path"), CreatedBy::Advisor, Utc::now());
        path.validate().map_err(AgentError::InvalidLearningPath)?;
        info!(
            session_id = %session_id,
            path_id = %path.id,
            milestones = path.milestones.len(),
            courses = path.total_courses(),
            "Generated learning path"
        );

        self.state.memory.record_learning_path(path.clone());
        self.refresh_system_prompt();
        self.scheduler
            .schedule(&mut self.state.memory, &self.state.transcript, &session_id);
        self.persist();
        Ok(path)
    }

    /// Swaps the user context for a persona from `directory`.
    ///
    /// Unknown ids resolve to the default profile. Returns the applied persona.
    pub fn apply_persona<'a>(&mut self, directory: &'a PersonaDirectory, persona_id: &str) -> &'a Persona {
        let persona = directory.resolve(persona_id);
        self.state.memory.reset(persona);
        self.scheduler.clear();
        self.refresh_system_prompt();
        info!(session_id = %self.state.session_id(), persona = %persona.id, "Applied persona");
        self.persist();
        persona
    }

    /// Saves the session and refreshes its registry summary.
    fn persist(&self) {
        if !self.state.persist() {
            return;
        }
        if let Err(e) = self
            .registry
            .upsert(self.state.session_id(), &self.state.memory)
        {
            warn!(session_id = %self.state.session_id(), error = %e, "Failed to update session registry");
        }
    }

    /// Removes every stored trace of a session.
    pub fn clear_session(store: &SharedStore, session_id: &str) -> Result<(), StorageError> {
        SessionState::<AdvisorMemory>::clear(store.as_ref(), Domain::Advisor, session_id)?;
        store.remove(&session_key(Domain::Advisor, session_id, KeySuffix::Artifact))?;
        SessionRegistry::new(store.clone()).remove(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompletionError;
    use crate::learning_path::fixtures::two_milestone_path;
    use crate::llm_client::MockCompletionClient;
    use crate::storage::{FileStore, MemoryStore};
    use crate::transcript::Role;
    use serde_json::json;

    fn store() -> SharedStore {
        Arc::new(MemoryStore::new())
    }

    fn extraction_reply(objective: Option<&str>, detected: bool) -> String {
        json!({
            "objective": objective,
            "relevant_experience": null,
            "background": null,
            "skill_level": null,
            "relevant_skills": [],
            "required_skills": [],
            "interests": [],
            "constraints": {"time_per_week": null, "deadline": null},
            "learning_path_detected": detected
        })
        .to_string()
    }

    /// A client answering the primary call with `reply` and extraction with `extraction`.
    fn client(reply: &'static str, extraction: String) -> MockCompletionClient {
        let mut client = MockCompletionClient::new();
        client
            .expect_complete()
            .withf(|req| req.response_format.is_none())
            .returning(move |_| Ok(reply.to_string()));
        client
            .expect_complete()
            .withf(|req| req.response_format.is_some())
            .returning(move |_| Ok(extraction.clone()));
        client
    }

    #[test]
    fn test_new_session_is_seeded() {
        let agent = AdvisorAgent::new("s1", store(), Arc::new(MockCompletionClient::new()));
        let messages = agent.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, ADVISOR_WELCOME_MESSAGE);
        assert_eq!(agent.initial_message(), ADVISOR_WELCOME_MESSAGE);
    }

    #[tokio::test]
    async fn test_respond_runs_full_pipeline_and_persists() {
        let store = store();
        let mut agent = AdvisorAgent::new(
            "s1",
            store.clone(),
            Arc::new(client("  What is your experience?  ", extraction_reply(Some("learn backend development"), false))),
        );

        let reply = agent.respond("I want to learn backend development").await.unwrap();
        assert_eq!(reply, "What is your experience?");
        assert_eq!(agent.memory().objective.as_deref(), Some("learn backend development"));
        assert!(agent.pending_actions().is_empty());

        let messages = agent.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages.iter().filter(|m| m.role == Role::System).count(), 1);

        let resumed = AdvisorAgent::new("s1", store.clone(), Arc::new(MockCompletionClient::new()));
        assert_eq!(resumed.memory(), agent.memory());
        assert_eq!(resumed.initial_message(), "What is your experience?");
        assert_eq!(SessionRegistry::new(store).get("s1").unwrap().objective.as_deref(), Some("learn backend development"));
    }

    #[tokio::test]
    async fn test_primary_failure_is_fatal_and_not_persisted() {
        let store = store();
        let mut client = MockCompletionClient::new();
        client
            .expect_complete()
            .times(1)
            .returning(|_| Err(CompletionError::InvalidResponse("no choices".into())));
        let mut agent = AdvisorAgent::new("s1", store.clone(), Arc::new(client));

        let err = agent.respond("hello").await.unwrap_err();
        assert!(matches!(err, AgentError::Completion(_)));
        assert!(store.get("advisor_s1_memory").unwrap().is_none());
        assert!(store.get("advisor_s1_messages").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_turn_survives_store_rejecting_writes() {
        let dir = tempfile::TempDir::new().unwrap();
        let store: SharedStore =
            Arc::new(FileStore::open(dir.path().join("store.json"), Some(8)).unwrap());
        let mut agent = AdvisorAgent::new(
            "s1",
            store.clone(),
            Arc::new(client("Tell me more.", extraction_reply(Some("learn Go"), false))),
        );

        let reply = agent.respond("I want to learn Go").await.unwrap();
        assert_eq!(reply, "Tell me more.");
        assert_eq!(agent.memory().objective.as_deref(), Some("learn Go"));
        assert_eq!(agent.messages().len(), 4);

        assert!(store.keys().unwrap().is_empty());
        assert!(SessionRegistry::new(store).is_empty());
    }

    #[tokio::test]
    async fn test_extraction_failure_is_swallowed() {
        let mut agent = AdvisorAgent::new(
            "s1",
            store(),
            Arc::new(client("Tell me more.", "not json".to_string())),
        );
        assert_eq!(agent.respond("hi").await.unwrap(), "Tell me more.");
        assert_eq!(agent.memory(), &AdvisorMemory::new());
    }

    #[tokio::test]
    async fn test_detected_path_schedules_once() {
        let mut agent = AdvisorAgent::new(
            "s1",
            store(),
            Arc::new(client("Here you go.", extraction_reply(Some("x"), true))),
        );
        agent.respond("make the plan").await.unwrap();
        assert_eq!(agent.pending_actions().len(), 2);
        agent.clear_pending_actions();

        agent.respond("thanks").await.unwrap();
        assert!(agent.pending_actions().is_empty());
        assert_eq!(agent.memory().scheduled_actions, vec!["save_learning_path"]);
    }

    #[tokio::test]
    async fn test_generate_learning_path_records_structured_path() {
        let mut client = MockCompletionClient::new();
        client
            .expect_complete()
            .withf(|req| {
                req.response_format
                    .as_ref()
                    .is_some_and(|f| f.json_schema.name == "learning_path")
            })
            .times(1)
            .returning(|_| {
                Ok(json!({
                    "title": "Backend",
                    "description": "APIs and storage",
                    "objective": "learn backend development",
                    "difficulty": "beginner",
                    "totalDuration": "6 weeks",
                    "prerequisites": [],
                    "milestones": [{
                        "title": "HTTP",
                        "description": "Requests",
                        "estimatedWeeks": 2,
                        "courses": [{
                            "title": "MDN HTTP",
                            "provider": "MDN",
                            "url": "https://developer.mozilla.org/en-US/docs/Web/HTTP",
                            "duration": "3h",
                            "type": "documentation",
                            "description": "Overview"
                        }],
                        "outcomes": [],
                        "projects": ["Echo server"]
                    }]
                })
                .to_string())
            });

        let mut agent = AdvisorAgent::new("s1", store(), Arc::new(client));
        let path = agent.generate_learning_path().await.unwrap();

        assert!(path.id.starts_with("path_"));
        assert_eq!(path.milestones[0].courses[0].id, format!("{}_m0_c0", path.id));
        assert!(agent.memory().learning_path_created);
        assert_eq!(agent.memory().learning_path.as_ref(), Some(&path));

        let actions = agent.pending_actions();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].payload["learning_path"]["id"], path.id.as_str());
    }

    #[tokio::test]
    async fn test_generated_path_without_courses_is_rejected() {
        let mut client = MockCompletionClient::new();
        client.expect_complete().returning(|_| {
            Ok(json!({
                "title": "Empty",
                "description": "",
                "objective": "",
                "difficulty": "",
                "totalDuration": "",
                "prerequisites": [],
                "milestones": []
            })
            .to_string())
        });
        let mut agent = AdvisorAgent::new("s1", store(), Arc::new(client));
        let err = agent.generate_learning_path().await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidLearningPath(_)));
        assert!(!agent.memory().learning_path_created);
    }

    #[test]
    fn test_apply_persona_resets_and_renders_context() {
        let directory = PersonaDirectory::builtin();
        let mut agent = AdvisorAgent::new("s1", store(), Arc::new(MockCompletionClient::new()));
        agent.state.memory.record_learning_path(two_milestone_path());
        agent.state.memory.mark_scheduled("save_learning_path");

        let persona = agent.apply_persona(&directory, "sr-frontend-123");
        assert_eq!(persona.role, "Senior Frontend Developer");
        assert!(!agent.memory().learning_path_created);
        assert!(agent.memory().scheduled_actions.is_empty());
        assert!(agent.messages()[0]
            .content
            .contains("- Current Role: Senior Frontend Developer"));
    }

    #[test]
    fn test_clear_session_removes_every_key() {
        let store = store();
        for suffix in ["memory", "messages", "artifact"] {
            store.set(&format!("advisor_s1_{suffix}"), "{}").unwrap();
        }
        SessionRegistry::new(store.clone())
            .upsert("s1", &AdvisorMemory::new())
            .unwrap();

        AdvisorAgent::clear_session(&store, "s1").unwrap();
        assert_eq!(store.keys().unwrap(), vec!["learning_agent_sessions".to_string()]);
        assert!(SessionRegistry::new(store).is_empty());
    }
}
