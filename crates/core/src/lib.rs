//! Conversational agents that turn a chat into a personalized learning path
//! and then teach it.
//!
//! The [`advisor`] gathers a learner profile turn by turn and, once enough is
//! known, produces a learning path and schedules its hand-off. The
//! [`teacher`] walks a learner through a path with structured lessons and
//! tracks a cursor over its milestones and courses. Both persist their
//! sessions through a [`storage::KeyValueStore`] chosen by the host.

pub mod advisor;
pub mod backup;
pub mod error;
pub mod learning_path;
pub mod llm_client;
pub mod prompt_config;
pub mod registry;
pub mod session;
pub mod storage;
pub mod teacher;
pub mod transcript;

pub use advisor::AdvisorAgent;
pub use error::{AgentError, BackupError, CompletionError, StorageError};
pub use learning_path::LearningPath;
pub use storage::{FileStore, KeyValueStore, MemoryStore, SharedStore};
pub use teacher::TeacherAgent;
