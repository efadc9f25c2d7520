//! Completion service boundary.
//!
//! The agents only ever need one operation from a model provider: send a list
//! of role-tagged messages, optionally constrained to a JSON schema, and get
//! the content of the first choice back. The wire types below describe that
//! request and response exactly. `OpenAICompatibleClient` sends them through
//! `async-openai`'s bring-your-own-types entry point so any OpenAI-compatible
//! endpoint (OpenAI, OpenRouter, Gemini's compatibility layer) can serve them.

use crate::error::CompletionError;
use crate::transcript::ChatMessage;
use async_openai::{Client, config::OpenAIConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Sampling settings for one kind of call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionOptions {
    /// Free-text conversational reply.
    pub const CONVERSATION: Self = Self {
        temperature: 0.7,
        max_tokens: 800,
    };
    /// Structured extraction after each exchange.
    pub const EXTRACTION: Self = Self {
        temperature: 0.0,
        max_tokens: 400,
    };
    /// Schema-constrained teacher reply (text or lesson).
    pub const LESSON: Self = Self {
        temperature: 0.7,
        max_tokens: 1500,
    };
    /// Schema-constrained learning path generation.
    pub const PATH_GENERATION: Self = Self {
        temperature: 0.4,
        max_tokens: 2000,
    };
}

/// A strict JSON-schema constraint on the reply content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub json_schema: JsonSchemaSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonSchemaSpec {
    pub name: String,
    pub strict: bool,
    pub schema: Value,
}

impl ResponseFormat {
    pub fn json_schema(name: impl Into<String>, schema: Value) -> Self {
        Self {
            kind: "json_schema",
            json_schema: JsonSchemaSpec {
                name: name.into(),
                strict: true,
                schema,
            },
        }
    }
}

/// The request body sent to the completion service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>, options: CompletionOptions) -> Self {
        Self {
            model: None,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            response_format: None,
        }
    }

    pub fn with_schema(mut self, format: ResponseFormat) -> Self {
        self.response_format = Some(format);
        self
    }
}

/// The subset of the provider response the agents read.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionChoice {
    pub message: Option<CompletionMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionMessage {
    pub content: Option<String>,
}

impl CompletionResponse {
    /// The content of the first choice, or an error describing what is missing.
    pub fn into_content(self) -> Result<String, CompletionError> {
        self.choices
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::InvalidResponse("response has no choices".into()))?
            .message
            .ok_or_else(|| CompletionError::InvalidResponse("first choice has no message".into()))?
            .content
            .ok_or_else(|| CompletionError::InvalidResponse("message has no content".into()))
    }
}

/// A client able to run one completion request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Runs the request and returns the first choice's message content.
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError>;
}

/// Runs a schema-constrained request and decodes the reply as `T`.
pub async fn complete_json<T>(
    client: &dyn CompletionClient,
    request: CompletionRequest,
) -> Result<T, CompletionError>
where
    T: serde::de::DeserializeOwned,
{
    let content = client.complete(request).await?;
    Ok(serde_json::from_str(content.trim())?)
}

/// An implementation of `CompletionClient` for any OpenAI-compatible API.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration for the OpenAI client, including API key and base URL.
    /// * `model` - The model identifier sent with every request (e.g., "openai/gpt-4o-mini").
    pub fn new(config: OpenAIConfig, model: String) -> Self {
        Self {
            client: Client::with_config(config),
            model,
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAICompatibleClient {
    async fn complete(&self, mut request: CompletionRequest) -> Result<String, CompletionError> {
        if request.model.is_none() {
            request.model = Some(self.model.clone());
        }
        debug!(
            model = %self.model,
            messages = request.messages.len(),
            structured = request.response_format.is_some(),
            "Sending completion request"
        );
        let response: CompletionResponse = self.client.chat().create_byot(request).await?;
        response.into_content()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let request = CompletionRequest::new(
            vec![ChatMessage::system("s"), ChatMessage::user("u")],
            CompletionOptions::EXTRACTION,
        )
        .with_schema(ResponseFormat::json_schema(
            "learning_profile",
            json!({"type": "object"}),
        ));

        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("model").is_none());
        assert_eq!(value["temperature"], 0.0);
        assert_eq!(value["max_tokens"], 400);
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["response_format"]["type"], "json_schema");
        assert_eq!(value["response_format"]["json_schema"]["name"], "learning_profile");
        assert_eq!(value["response_format"]["json_schema"]["strict"], true);
    }

    #[test]
    fn test_unconstrained_request_omits_response_format() {
        let request = CompletionRequest::new(vec![], CompletionOptions::CONVERSATION);
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("response_format").is_none());
    }

    #[test]
    fn test_response_content_extraction() {
        let ok: CompletionResponse =
            serde_json::from_value(json!({"choices": [{"message": {"content": "hi"}}]})).unwrap();
        assert_eq!(ok.into_content().unwrap(), "hi");

        let empty: CompletionResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(matches!(
            empty.into_content(),
            Err(CompletionError::InvalidResponse(_))
        ));

        let no_message: CompletionResponse =
            serde_json::from_value(json!({"choices": [{"finish_reason": "stop"}]})).unwrap();
        assert!(matches!(
            no_message.into_content(),
            Err(CompletionError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_complete_json_decodes_reply() {
        #[derive(Deserialize)]
        struct Reply {
            ok: bool,
        }

        let mut client = MockCompletionClient::new();
        client
            .expect_complete()
            .returning(|_| Ok("  {\"ok\": true}\n".to_string()));

        let reply: Reply = complete_json(
            &client,
            CompletionRequest::new(vec![], CompletionOptions::EXTRACTION),
        )
        .await
        .unwrap();
        assert!(reply.ok);
    }

    #[tokio::test]
    async fn test_complete_json_reports_decode_failure() {
        let mut client = MockCompletionClient::new();
        client
            .expect_complete()
            .returning(|_| Ok("not json".to_string()));

        let result: Result<serde_json::Value, _> = complete_json(
            &client,
            CompletionRequest::new(vec![], CompletionOptions::EXTRACTION),
        )
        .await;
        assert!(matches!(result, Err(CompletionError::Decode(_))));
    }
}
