//! Executes the actions an advisor turn schedules.
//!
//! The agent only records intent. The host decides what each action means:
//! the learning path artifact is written next to the session, and the hand-off
//! is POSTed to an external backend when one is configured. Failures here are
//! logged and never reach the user.

use crate::state::AppState;
use anyhow::Context;
use pathwise_core::advisor::{ActionRecord, ActionType, AdvisorAgent};
use pathwise_core::storage::{Domain, KeySuffix, session_key};
use tracing::{error, info};

/// Runs every pending action of `agent`, then clears them.
pub async fn execute_pending(state: &AppState, agent: &mut AdvisorAgent) -> usize {
    let session_id = agent.session_id().to_string();
    let actions = agent.pending_actions().to_vec();
    for action in &actions {
        if let Err(e) = execute(state, &session_id, action).await {
            error!(session_id = %session_id, action = %action.action_type, error = ?e, "Action failed");
        }
    }
    agent.clear_pending_actions();
    actions.len()
}

async fn execute(state: &AppState, session_id: &str, action: &ActionRecord) -> anyhow::Result<()> {
    match action.action_type {
        ActionType::SaveLearningPath => {
            let key = session_key(Domain::Advisor, session_id, KeySuffix::Artifact);
            state
                .store
                .set(&key, &action.payload.to_string())
                .with_context(|| format!("Failed to write artifact '{}'", key))?;
            info!(session_id, key = %key, "Saved learning path artifact");
        }
        ActionType::SendToBackend => {
            let Some(url) = state.handoff_url.as_deref() else {
                info!(session_id, "No HANDOFF_URL configured; skipping hand-off");
                return Ok(());
            };
            let response = state
                .http
                .post(url)
                .json(&action.payload)
                .send()
                .await
                .context("Failed to send learning path hand-off")?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                anyhow::bail!("Hand-off endpoint returned {} - {}", status, body);
            }
            info!(session_id, url, "Handed off learning path");
        }
    }
    Ok(())
}
