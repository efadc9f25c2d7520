//! Action scheduling.
//!
//! After every memory update the scheduler decides which one-shot side
//! effects have newly become due. A due action family is emitted into the
//! per-turn buffer and its tag is written to `scheduled_actions` in the same
//! step, before anyone executes it. Scheduling is therefore at-most-once per
//! session; a caller that drops an action does not get it again.

use crate::advisor::memory::AdvisorMemory;
use crate::learning_path::LearningPath;
use crate::transcript::{Role, Transcript};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    SaveLearningPath,
    SendToBackend,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::SaveLearningPath => "save_learning_path",
            ActionType::SendToBackend => "send_to_backend",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One side effect for the caller to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub payload: Value,
}

/// The deliverable handed to downstream consumers.
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    Structured(LearningPath),
    Text(String),
}

impl Artifact {
    pub fn to_value(&self) -> Value {
        match self {
            Artifact::Structured(path) => serde_json::to_value(path).unwrap_or(Value::Null),
            Artifact::Text(text) => Value::String(text.clone()),
        }
    }
}

/// Finds the agreed-upon learning path for the payload.
pub trait ArtifactLocator: Send + Sync {
    fn locate(&self, memory: &AdvisorMemory, transcript: &Transcript) -> Option<Artifact>;
}

/// Legacy fallback: scans recent assistant replies for something that looks
/// like a plan.
#[derive(Debug, Clone)]
pub struct KeywordScanLocator {
    pub lookback: usize,
    pub min_length: usize,
    pub keywords: Vec<&'static str>,
}

impl Default for KeywordScanLocator {
    fn default() -> Self {
        Self {
            lookback: 5,
            min_length: 200,
            keywords: vec!["milestone", "phase", "step", "week"],
        }
    }
}

impl ArtifactLocator for KeywordScanLocator {
    fn locate(&self, _memory: &AdvisorMemory, transcript: &Transcript) -> Option<Artifact> {
        transcript
            .tail(self.lookback)
            .iter()
            .rev()
            .filter(|m| m.role == Role::Assistant && m.content.chars().count() > self.min_length)
            .find(|m| {
                let lower = m.content.to_lowercase();
                self.keywords.iter().any(|kw| lower.contains(kw))
            })
            .map(|m| Artifact::Text(m.content.clone()))
    }
}

/// Prefers the structured path in memory and falls back to another locator.
pub struct StructuredFirstLocator {
    fallback: Arc<dyn ArtifactLocator>,
}

impl StructuredFirstLocator {
    pub fn new(fallback: Arc<dyn ArtifactLocator>) -> Self {
        Self { fallback }
    }
}

impl Default for StructuredFirstLocator {
    fn default() -> Self {
        Self::new(Arc::new(KeywordScanLocator::default()))
    }
}

impl ArtifactLocator for StructuredFirstLocator {
    fn locate(&self, memory: &AdvisorMemory, transcript: &Transcript) -> Option<Artifact> {
        match &memory.learning_path {
            Some(path) => Some(Artifact::Structured(path.clone())),
            None => self.fallback.locate(memory, transcript),
        }
    }
}

/// The rule engine plus its per-turn output buffer.
pub struct ActionScheduler {
    locator: Arc<dyn ArtifactLocator>,
    pending: Vec<ActionRecord>,
}

impl Default for ActionScheduler {
    fn default() -> Self {
        Self::new(Arc::new(StructuredFirstLocator::default()))
    }
}

impl ActionScheduler {
    pub fn new(locator: Arc<dyn ArtifactLocator>) -> Self {
        Self {
            locator,
            pending: Vec::new(),
        }
    }

    /// Recomputes the buffer for this turn.
    ///
    /// The buffer is replaced, not extended: actions left over from an
    /// earlier turn are dropped.
    pub fn schedule(
        &mut self,
        memory: &mut AdvisorMemory,
        transcript: &Transcript,
        session_id: &str,
    ) -> &[ActionRecord] {
        self.pending.clear();

        let tag = ActionType::SaveLearningPath.as_str();
        if memory.learning_path_created && !memory.has_scheduled(tag) {
            let learning_path = self
                .locator
                .locate(memory, transcript)
                .map(|a| a.to_value())
                .unwrap_or(Value::Null);

            self.pending.push(ActionRecord {
                action_type: ActionType::SaveLearningPath,
                payload: json!({
                    "objective": memory.objective,
                    "learning_path": learning_path,
                }),
            });
            self.pending.push(ActionRecord {
                action_type: ActionType::SendToBackend,
                payload: json!({
                    "session_id": session_id,
                    "objective": memory.objective,
                    "learning_path": learning_path,
                }),
            });

            memory.mark_scheduled(tag);
            info!(session_id, tag, actions = self.pending.len(), "Scheduled learning path actions");
        }

        &self.pending
    }

    pub fn pending(&self) -> &[ActionRecord] {
        &self.pending
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learning_path::fixtures::two_milestone_path;
    use crate::transcript::ChatMessage;

    fn long_plan() -> String {
        format!(
            "Here is your plan. Milestone 1: HTTP. {}",
            "Practice every day with small projects. ".repeat(8)
        )
    }

    fn created_memory() -> AdvisorMemory {
        AdvisorMemory {
            objective: Some("learn backend development".into()),
            learning_path_created: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_nothing_due_before_path_exists() {
        let mut scheduler = ActionScheduler::default();
        let mut memory = AdvisorMemory::new();
        assert!(scheduler.schedule(&mut memory, &Transcript::new(), "s").is_empty());
        assert!(memory.scheduled_actions.is_empty());
    }

    #[test]
    fn test_emits_persist_then_notify_and_marks_tag() {
        let mut transcript = Transcript::new();
        transcript.push(ChatMessage::assistant(long_plan()));

        let mut scheduler = ActionScheduler::default();
        let mut memory = created_memory();
        let actions = scheduler.schedule(&mut memory, &transcript, "session_9").to_vec();

        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].action_type, ActionType::SaveLearningPath);
        assert_eq!(actions[1].action_type, ActionType::SendToBackend);
        assert_eq!(actions[1].payload["session_id"], "session_9");
        assert_eq!(actions[0].payload["learning_path"], Value::String(long_plan()));
        assert_eq!(memory.scheduled_actions, vec!["save_learning_path"]);
    }

    #[test]
    fn test_at_most_once() {
        let mut scheduler = ActionScheduler::default();
        let mut memory = created_memory();
        memory.mark_scheduled("save_learning_path");
        assert!(scheduler.schedule(&mut memory, &Transcript::new(), "s").is_empty());
        assert_eq!(memory.scheduled_actions.len(), 1);
    }

    #[test]
    fn test_buffer_is_replaced_each_turn() {
        let mut scheduler = ActionScheduler::default();
        let mut memory = created_memory();
        assert_eq!(scheduler.schedule(&mut memory, &Transcript::new(), "s").len(), 2);
        assert!(scheduler.schedule(&mut memory, &Transcript::new(), "s").is_empty());
        assert!(scheduler.pending().is_empty());
    }

    #[test]
    fn test_missing_artifact_yields_null_payload() {
        let mut transcript = Transcript::new();
        transcript.push(ChatMessage::assistant("short milestone note"));
        let mut scheduler = ActionScheduler::default();
        let mut memory = created_memory();
        let actions = scheduler.schedule(&mut memory, &transcript, "s");
        assert_eq!(actions[0].payload["learning_path"], Value::Null);
    }

    #[test]
    fn test_keyword_scan_respects_lookback_and_role() {
        let locator = KeywordScanLocator::default();
        let mut transcript = Transcript::new();
        transcript.push(ChatMessage::assistant(long_plan()));
        for i in 0..5 {
            transcript.push(ChatMessage::user(format!("follow-up {i}")));
        }
        assert!(locator.locate(&AdvisorMemory::new(), &transcript).is_none());

        let mut user_plan = Transcript::new();
        user_plan.push(ChatMessage::user(long_plan()));
        assert!(locator.locate(&AdvisorMemory::new(), &user_plan).is_none());
    }

    #[test]
    fn test_keyword_scan_prefers_newest_match() {
        let locator = KeywordScanLocator::default();
        let mut transcript = Transcript::new();
        transcript.push(ChatMessage::assistant(long_plan()));
        let newer = format!("WEEK ONE starts now. {}", "Read and build. ".repeat(15));
        transcript.push(ChatMessage::assistant(newer.clone()));
        assert_eq!(
            locator.locate(&AdvisorMemory::new(), &transcript),
            Some(Artifact::Text(newer))
        );
    }

    #[test]
    fn test_structured_path_wins_over_scan() {
        let mut transcript = Transcript::new();
        transcript.push(ChatMessage::assistant(long_plan()));
        let mut memory = created_memory();
        memory.learning_path = Some(two_milestone_path());

        let mut scheduler = ActionScheduler::default();
        let actions = scheduler.schedule(&mut memory, &transcript, "s");
        assert_eq!(actions[0].payload["learning_path"]["title"], "Backend Foundations");
    }

    #[test]
    fn test_action_record_wire_shape() {
        let record = ActionRecord {
            action_type: ActionType::SendToBackend,
            payload: json!({}),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], "send_to_backend");
    }
}
