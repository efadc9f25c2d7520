//! Teacher Progress Tools
//!
//! Exposes a teacher session's cursor through the Model Context Protocol so an
//! LLM runtime can advance the path and record feedback with tool calls, the
//! same way it delivers lessons.

use crate::teacher::agent::TeacherAgent;
use crate::teacher::memory::{DifficultyLevel, FeedbackUpdate, PreferredStyle, Progress};
use rmcp::{
    ServerHandler,
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::{ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{info, warn};

/// Arguments for the `set_feedback` tool. Omitted fields are left unchanged.
#[derive(Deserialize, JsonSchema, Debug, Default)]
pub struct SetFeedbackArgs {
    #[schemars(description = "True if the learner says the material is boring")]
    pub is_boring: Option<bool>,
    #[schemars(description = "How the learner rates the difficulty: 'too_easy', 'just_right' or 'too_hard'")]
    pub difficulty_level: Option<DifficultyLevel>,
    #[schemars(description = "The learner's preferred style: 'theory', 'practical' or 'mixed'")]
    pub preferred_style: Option<PreferredStyle>,
}

impl From<SetFeedbackArgs> for FeedbackUpdate {
    fn from(args: SetFeedbackArgs) -> Self {
        FeedbackUpdate {
            is_boring: args.is_boring,
            difficulty_level: args.difficulty_level,
            preferred_style: args.preferred_style,
        }
    }
}

pub struct TeacherToolService {
    pub agent: Arc<Mutex<TeacherAgent>>,
    /// Receives a progress snapshot after every cursor change.
    pub progress_tx: Option<mpsc::Sender<Progress>>,
    tool_router: ToolRouter<Self>,
}

#[tool_handler]
impl ServerHandler for TeacherToolService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[tool_router]
impl TeacherToolService {
    pub fn new(agent: Arc<Mutex<TeacherAgent>>, progress_tx: Option<mpsc::Sender<Progress>>) -> Self {
        Self {
            agent,
            progress_tx,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Get the learner's progress: current milestone and course, completed count and completion percentage."
    )]
    pub async fn get_progress(&self) -> Result<String, String> {
        info!("Executing tool 'get_progress'");
        let agent = self.agent.lock().await;
        serde_json::to_string(&agent.progress())
            .map_err(|e| format!("Failed to serialize progress: {}", e))
    }

    /// Completes the course under the cursor and moves on.
    #[tool(
        description = "Mark the current course as complete once the learner has demonstrated understanding, and move to the next course."
    )]
    pub async fn mark_course_complete(&self) -> Result<String, String> {
        info!("Executing tool 'mark_course_complete'");
        let mut agent = self.agent.lock().await;
        let progress = agent.mark_complete().map_err(|e| e.to_string())?;

        let message = if progress.finished {
            "OK. The learning path is complete.".to_string()
        } else {
            match &progress.current_course {
                Some(course) => format!(
                    "OK. {}/{} courses complete. Next course: '{}'.",
                    progress.completed_count, progress.total_courses, course.title
                ),
                None => "OK. Course marked complete.".to_string(),
            }
        };

        if let Some(tx) = &self.progress_tx {
            if tx.send(progress).await.is_err() {
                warn!("Failed to broadcast progress update: receiver dropped.");
            }
        }
        Ok(message)
    }

    #[tool(
        description = "Record the learner's feedback about the lessons (boring, too easy, too hard, preferred style) so later lessons adapt."
    )]
    pub async fn set_feedback(&self, args: Parameters<SetFeedbackArgs>) -> Result<String, String> {
        info!(args = ?args.0, "Executing tool 'set_feedback'");
        let mut agent = self.agent.lock().await;
        agent.set_feedback(&args.0.into());
        Ok("OK. Feedback recorded.".to_string())
    }
}
