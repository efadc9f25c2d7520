//! Error types shared across the agent core.
//!
//! Errors are split by how the caller is expected to treat them: storage and
//! backup failures are recoverable and usually only logged, while completion
//! failures on the primary call end the turn.

use async_openai::error::OpenAIError;

/// Failures raised by a [`crate::storage::KeyValueStore`].
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage is unavailable: {0}")]
    Unavailable(String),
    #[error("storage quota exceeded while writing '{key}' ({needed} bytes needed, limit {limit})")]
    QuotaExceeded {
        key: String,
        needed: usize,
        limit: usize,
    },
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to (de)serialize stored value: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures talking to the completion service.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Transport(#[from] OpenAIError),
    #[error("invalid completion response: {0}")]
    InvalidResponse(String),
    #[error("failed to decode structured reply: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors that end an agent operation and must reach the caller.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error("no learning path is loaded for this session")]
    NoLearningPath,
    #[error("invalid learning path: {0}")]
    InvalidLearningPath(String),
}

/// Errors from bulk export and import.
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("backup is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid export file format: {0}")]
    InvalidFormat(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
