//! API Models
//!
//! Request and response bodies for the REST API. Core types that are already
//! serializable are embedded as-is and documented as free-form objects; the
//! rest are mirrored here so `utoipa` can describe them.

use chrono::{DateTime, Utc};
use pathwise_core::advisor::{AdvisorMemory, Persona};
use pathwise_core::backup::StorageSummary;
use pathwise_core::learning_path::LearningPath;
use pathwise_core::registry::{SessionSummary, TeacherSession};
use pathwise_core::teacher::{
    DifficultyLevel, FeedbackUpdate, PreferredStyle, Progress, TeacherResponse, UserFeedback,
};
use pathwise_core::transcript::ChatMessage;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct Message {
    #[schema(example = "user")]
    pub role: String,
    pub content: String,
}

impl From<&ChatMessage> for Message {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role.to_string(),
            content: message.content.clone(),
        }
    }
}

// --- Advisor ---

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorSessionCreated {
    #[schema(example = "session_1760000000000_k3j9x0a1b")]
    pub session_id: String,
    pub initial_message: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorSessionSummary {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub objective: Option<String>,
    pub skill_level: Option<String>,
    pub skills: Vec<String>,
    pub learning_path_created: bool,
}

impl From<SessionSummary> for AdvisorSessionSummary {
    fn from(summary: SessionSummary) -> Self {
        Self {
            session_id: summary.session_id,
            created_at: summary.created_at,
            updated_at: summary.updated_at,
            objective: summary.objective,
            skill_level: summary.skill_level,
            skills: summary.skills,
            learning_path_created: summary.learning_path_created,
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorSessionView {
    pub session_id: String,
    #[schema(value_type = Object)]
    pub memory: AdvisorMemory,
    /// The conversation without the system message.
    pub messages: Vec<Message>,
}

#[derive(Deserialize, ToSchema, Debug)]
pub struct SendMessagePayload {
    #[schema(example = "I want to become a backend developer")]
    pub message: String,
}

#[derive(Serialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorReply {
    pub reply: String,
    pub learning_path_created: bool,
    /// How many scheduled actions ran after this turn.
    pub actions_executed: usize,
}

#[derive(Serialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LearningPathResponse {
    #[schema(value_type = Object)]
    pub learning_path: LearningPath,
}

#[derive(Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ApplyPersonaPayload {
    #[schema(example = "backend-ai-789")]
    pub persona_id: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct PersonaInfo {
    pub id: String,
    pub role: String,
    pub focus: String,
    pub certifications: Vec<String>,
    pub objective: Option<String>,
    pub skills: Vec<String>,
}

impl From<&Persona> for PersonaInfo {
    fn from(persona: &Persona) -> Self {
        Self {
            id: persona.id.clone(),
            role: persona.role.clone(),
            focus: persona.focus.clone(),
            certifications: persona.certifications.clone(),
            objective: persona.objective.clone(),
            skills: persona.skills.clone(),
        }
    }
}

// --- Teacher ---

/// Either an explicit path or the advisor session whose path to teach.
#[derive(Deserialize, ToSchema, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeacherSessionPayload {
    #[schema(value_type = Option<Object>)]
    pub learning_path: Option<LearningPath>,
    pub advisor_session_id: Option<String>,
}

#[derive(Serialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TeacherSessionSummary {
    pub session_id: String,
    pub path_title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_courses: usize,
    pub total_courses: usize,
}

impl From<TeacherSession> for TeacherSessionSummary {
    fn from(session: TeacherSession) -> Self {
        Self {
            session_id: session.session_id,
            path_title: session.learning_path.title.clone(),
            created_at: session.created_at,
            updated_at: session.updated_at,
            completed_courses: session.memory.completed_courses.len(),
            total_courses: session.learning_path.total_courses(),
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TeacherSessionView {
    pub session_id: String,
    #[schema(value_type = Object)]
    pub progress: Progress,
    #[schema(value_type = Object)]
    pub feedback: UserFeedback,
    pub messages: Vec<Message>,
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct TeacherReply {
    /// `{"type": "text", "content": ...}` or a lesson with its quiz question.
    #[schema(value_type = Object)]
    pub response: TeacherResponse,
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct ProgressResponse {
    #[schema(value_type = Object)]
    pub progress: Progress,
}

#[derive(Deserialize, ToSchema, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackPayload {
    pub is_boring: Option<bool>,
    #[schema(value_type = Option<String>, example = "too_hard")]
    pub difficulty_level: Option<DifficultyLevel>,
    #[schema(value_type = Option<String>, example = "practical")]
    pub preferred_style: Option<PreferredStyle>,
}

impl From<FeedbackPayload> for FeedbackUpdate {
    fn from(payload: FeedbackPayload) -> Self {
        FeedbackUpdate {
            is_boring: payload.is_boring,
            difficulty_level: payload.difficulty_level,
            preferred_style: payload.preferred_style,
        }
    }
}

// --- Storage ---

#[derive(Deserialize, Debug, Default)]
pub struct ImportParams {
    /// `merge` (default) or `replace`.
    pub mode: Option<String>,
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct ImportResult {
    pub imported: usize,
}

#[derive(Serialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorageSummaryResponse {
    pub total_keys: usize,
    pub advisor_sessions: usize,
    pub teacher_sessions: usize,
    pub has_prompt_config: bool,
    pub storage_size: usize,
}

impl From<StorageSummary> for StorageSummaryResponse {
    fn from(summary: StorageSummary) -> Self {
        Self {
            total_keys: summary.total_keys,
            advisor_sessions: summary.advisor_sessions,
            teacher_sessions: summary.teacher_sessions,
            has_prompt_config: summary.has_prompt_config,
            storage_size: summary.storage_size,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathwise_core::transcript::Role;

    #[test]
    fn test_message_from_chat_message() {
        let message = Message::from(&ChatMessage::assistant("Hello!"));
        assert_eq!(message.role, "assistant");
        assert_eq!(message.content, "Hello!");
        assert_eq!(Role::User.to_string(), Message::from(&ChatMessage::user("x")).role);
    }

    #[test]
    fn test_feedback_payload_deserialization() {
        let payload: FeedbackPayload =
            serde_json::from_str(r#"{"difficultyLevel": "too_hard", "preferredStyle": "practical"}"#)
                .unwrap();
        let update = FeedbackUpdate::from(payload);
        assert_eq!(update.is_boring, None);
        assert_eq!(update.difficulty_level, Some(DifficultyLevel::TooHard));
        assert_eq!(update.preferred_style, Some(PreferredStyle::Practical));
    }

    #[test]
    fn test_feedback_payload_rejects_unknown_level() {
        let result: Result<FeedbackPayload, _> =
            serde_json::from_str(r#"{"difficultyLevel": "impossible"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_create_teacher_session_payload_allows_either_source() {
        let by_advisor: CreateTeacherSessionPayload =
            serde_json::from_str(r#"{"advisorSessionId": "session_1"}"#).unwrap();
        assert_eq!(by_advisor.advisor_session_id.as_deref(), Some("session_1"));
        assert!(by_advisor.learning_path.is_none());

        let empty: CreateTeacherSessionPayload = serde_json::from_str("{}").unwrap();
        assert!(empty.advisor_session_id.is_none());
    }

    #[test]
    fn test_error_response_serialization() {
        let error = ErrorResponse {
            message: "Session not found".to_string(),
        };
        let json = serde_json::to_string(&error).unwrap();
        assert_eq!(json, r#"{"message":"Session not found"}"#);
    }

    #[test]
    fn test_send_message_payload_missing_field() {
        let result: Result<SendMessagePayload, _> = serde_json::from_str("{}");
        assert!(result.is_err());
    }
}
