//! Structured extraction.
//!
//! After each exchange a second, independent completion call turns the latest
//! user text (and the assistant's reply) into an [`ExtractionData`] object.
//! The reply is constrained to a strict schema so it always decodes into the
//! same shape; the agent treats any failure here as "nothing learned".

use crate::advisor::memory::ExtractionData;
use crate::error::CompletionError;
use crate::llm_client::{
    CompletionClient, CompletionOptions, CompletionRequest, ResponseFormat, complete_json,
};
use crate::transcript::ChatMessage;
use serde_json::{Value, json};
use std::sync::Arc;

pub const EXTRACTION_INSTRUCTIONS: &str = "Extract structured information from the user's message.
Fill in any new information clearly stated or strongly implied.
Use null for missing strings, [] for empty arrays, {} for empty objects.

IMPORTANT - Skills extraction:
- relevant_skills: Skills the user ALREADY HAS or CURRENTLY KNOWS (e.g., \"I know Python\", \"experienced in programming\", \"professional developer\")
- required_skills: Skills the user NEEDS TO LEARN or wants to acquire (e.g., \"want to learn ML\", \"need to understand RL\", \"looking to master AI\")
- When extracting from experience/background, put known skills in relevant_skills
- When extracting from objectives/goals, put target skills in required_skills
- Be specific and granular with skill names

Set learning_path_detected to true if the assistant's response contains a structured learning path.";

/// The `learning_profile` schema the extraction reply must match.
pub fn learning_profile_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "objective": { "type": ["string", "null"] },
            "relevant_experience": { "type": ["string", "null"] },
            "background": { "type": ["string", "null"] },
            "skill_level": { "type": ["string", "null"] },
            "relevant_skills": { "type": "array", "items": { "type": "string" } },
            "required_skills": { "type": "array", "items": { "type": "string" } },
            "interests": { "type": "array", "items": { "type": "string" } },
            "constraints": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "time_per_week": { "type": ["string", "null"] },
                    "deadline": { "type": ["string", "null"] }
                },
                "required": ["time_per_week", "deadline"]
            },
            "learning_path_detected": { "type": "boolean" }
        },
        "required": [
            "objective",
            "relevant_experience",
            "background",
            "skill_level",
            "relevant_skills",
            "required_skills",
            "interests",
            "constraints",
            "learning_path_detected"
        ]
    })
}

/// The two-message conversation sent to the extraction call.
pub fn extraction_messages(user_text: &str, assistant_text: Option<&str>) -> Vec<ChatMessage> {
    let text = match assistant_text {
        Some(assistant) => format!("{user_text}\n\nAssistant response: {assistant}"),
        None => user_text.to_string(),
    };
    vec![
        ChatMessage::system(EXTRACTION_INSTRUCTIONS),
        ChatMessage::user(text),
    ]
}

/// Issues the schema-constrained extraction call.
#[derive(Clone)]
pub struct ProfileExtractor {
    client: Arc<dyn CompletionClient>,
}

impl ProfileExtractor {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    pub fn request(user_text: &str, assistant_text: Option<&str>) -> CompletionRequest {
        CompletionRequest::new(
            extraction_messages(user_text, assistant_text),
            CompletionOptions::EXTRACTION,
        )
        .with_schema(ResponseFormat::json_schema(
            "learning_profile",
            learning_profile_schema(),
        ))
    }

    pub async fn extract(
        &self,
        user_text: &str,
        assistant_text: Option<&str>,
    ) -> Result<ExtractionData, CompletionError> {
        complete_json(
            self.client.as_ref(),
            Self::request(user_text, assistant_text),
        )
        .await
    }
}
