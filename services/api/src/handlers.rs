//! Axum Handlers for the REST API
//!
//! Each handler opens the agent for its session from the store, runs one
//! operation and lets the agent persist. Turns on the same session are
//! serialized through the per-session locks in [`AppState`].
//! It uses `utoipa` doc comments to generate OpenAPI documentation.

use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use pathwise_core::advisor::AdvisorAgent;
use pathwise_core::backup::{ImportMode, StorageManager};
use pathwise_core::registry::{SessionRegistry, TeacherRegistry, generate_advisor_session_id};
use pathwise_core::teacher::{FeedbackUpdate, TeacherAgent};
use pathwise_core::{AgentError, BackupError};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::{
    actions::execute_pending,
    models::{
        AdvisorReply, AdvisorSessionCreated, AdvisorSessionSummary, AdvisorSessionView,
        ApplyPersonaPayload, CreateTeacherSessionPayload, ErrorResponse, FeedbackPayload,
        ImportParams, ImportResult, LearningPathResponse, Message, PersonaInfo, ProgressResponse,
        SendMessagePayload, StorageSummaryResponse, TeacherReply, TeacherSessionSummary,
        TeacherSessionView,
    },
    state::AppState,
};

/// Shown to the user whenever a turn fails upstream.
pub const TURN_FAILED_MESSAGE: &str = "I encountered an error, please try again.";

pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    /// The completion service failed; nothing was persisted.
    Upstream(AgentError),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { message })).into_response()
            }
            ApiError::Conflict(message) => {
                (StatusCode::CONFLICT, Json(ErrorResponse { message })).into_response()
            }
            ApiError::Upstream(err) => {
                error!("Turn failed: {}", err);
                let message = TURN_FAILED_MESSAGE.to_string();
                (StatusCode::BAD_GATEWAY, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

impl ApiError {
    fn from_agent(err: AgentError) -> Self {
        match err {
            AgentError::Completion(_) => Self::Upstream(err),
            AgentError::NoLearningPath => Self::Conflict(err.to_string()),
            AgentError::InvalidLearningPath(_) => Self::BadRequest(err.to_string()),
        }
    }
}

fn advisor_view(agent: &AdvisorAgent) -> AdvisorSessionView {
    AdvisorSessionView {
        session_id: agent.session_id().to_string(),
        memory: agent.memory().clone(),
        messages: agent.messages().iter().skip(1).map(Message::from).collect(),
    }
}

fn teacher_view(agent: &TeacherAgent) -> TeacherSessionView {
    TeacherSessionView {
        session_id: agent.session_id().to_string(),
        progress: agent.progress(),
        feedback: agent.memory().user_feedback.clone(),
        messages: agent.messages().iter().map(Message::from).collect(),
    }
}

fn teacher_not_found(id: &str) -> ApiError {
    ApiError::NotFound(format!("Teacher session with id '{}' not found", id))
}

// --- Advisor ---

/// Start a new advisor conversation.
#[utoipa::path(
    post,
    path = "/advisor/sessions",
    responses(
        (status = 201, description = "Session created", body = AdvisorSessionCreated)
    ),
    tag = "advisor"
)]
#[instrument(skip(state))]
pub async fn create_advisor_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session_id = generate_advisor_session_id();
    let agent = state.open_advisor(&session_id);
    info!(session_id = %session_id, "Created advisor session");
    (
        StatusCode::CREATED,
        Json(AdvisorSessionCreated {
            initial_message: agent.initial_message(),
            session_id,
        }),
    )
}

/// List advisor sessions, most recently updated first.
#[utoipa::path(
    get,
    path = "/advisor/sessions",
    responses(
        (status = 200, description = "List of sessions", body = [AdvisorSessionSummary])
    ),
    tag = "advisor"
)]
pub async fn list_advisor_sessions(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<AdvisorSessionSummary>> {
    let sessions = SessionRegistry::new(state.store.clone()).all();
    Json(sessions.into_iter().map(Into::into).collect())
}

/// The most recently updated advisor session.
#[utoipa::path(
    get,
    path = "/advisor/sessions/recent",
    responses(
        (status = 200, description = "Most recent session", body = AdvisorSessionSummary),
        (status = 404, description = "No sessions yet", body = ErrorResponse)
    ),
    tag = "advisor"
)]
pub async fn recent_advisor_session(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AdvisorSessionSummary>, ApiError> {
    SessionRegistry::new(state.store.clone())
        .most_recent()
        .map(|s| Json(s.into()))
        .ok_or_else(|| ApiError::NotFound("No advisor sessions yet".to_string()))
}

/// Get an advisor session's profile and conversation.
#[utoipa::path(
    get,
    path = "/advisor/sessions/{id}",
    responses(
        (status = 200, description = "Session details", body = AdvisorSessionView),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(("id" = String, Path, description = "Advisor session ID")),
    tag = "advisor"
)]
#[instrument(skip(state))]
pub async fn get_advisor_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AdvisorSessionView>, ApiError> {
    if SessionRegistry::new(state.store.clone()).get(&id).is_none() {
        return Err(ApiError::NotFound(format!(
            "Advisor session with id '{}' not found",
            id
        )));
    }
    let _guard = state.locks.acquire(&id).await;
    Ok(Json(advisor_view(&state.open_advisor(&id))))
}

/// Delete an advisor session and everything stored for it.
#[utoipa::path(
    delete,
    path = "/advisor/sessions/{id}",
    responses(
        (status = 204, description = "Session deleted"),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(("id" = String, Path, description = "Advisor session ID")),
    tag = "advisor"
)]
#[instrument(skip(state))]
pub async fn delete_advisor_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let _guard = state.locks.acquire(&id).await;
    AdvisorAgent::clear_session(&state.store, &id)?;
    info!(session_id = %id, "Deleted advisor session");
    Ok(StatusCode::NO_CONTENT)
}

/// Send a message to the advisor and get its reply.
///
/// Scheduled actions run before the response is returned.
#[utoipa::path(
    post,
    path = "/advisor/sessions/{id}/messages",
    request_body = SendMessagePayload,
    responses(
        (status = 200, description = "Assistant reply", body = AdvisorReply),
        (status = 400, description = "Empty message", body = ErrorResponse),
        (status = 502, description = "Completion service failed", body = ErrorResponse)
    ),
    params(("id" = String, Path, description = "Advisor session ID")),
    tag = "advisor"
)]
#[instrument(skip(state, payload))]
pub async fn send_advisor_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<SendMessagePayload>,
) -> Result<Json<AdvisorReply>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }
    let _guard = state.locks.acquire(&id).await;
    let mut agent = state.open_advisor(&id);
    let reply = agent
        .respond(&payload.message)
        .await
        .map_err(ApiError::from_agent)?;
    let actions_executed = execute_pending(&state, &mut agent).await;

    Ok(Json(AdvisorReply {
        reply,
        learning_path_created: agent.memory().learning_path_created,
        actions_executed,
    }))
}

/// Generate a structured learning path from the gathered profile.
#[utoipa::path(
    post,
    path = "/advisor/sessions/{id}/learning-path",
    responses(
        (status = 200, description = "Generated learning path", body = LearningPathResponse),
        (status = 502, description = "Completion service failed", body = ErrorResponse)
    ),
    params(("id" = String, Path, description = "Advisor session ID")),
    tag = "advisor"
)]
#[instrument(skip(state))]
pub async fn generate_learning_path(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<LearningPathResponse>, ApiError> {
    let _guard = state.locks.acquire(&id).await;
    let mut agent = state.open_advisor(&id);
    let learning_path = agent.generate_learning_path().await.map_err(|e| match e {
        // Generated paths that fail validation are upstream failures.
        AgentError::InvalidLearningPath(_) => ApiError::Upstream(e),
        other => ApiError::from_agent(other),
    })?;
    execute_pending(&state, &mut agent).await;
    Ok(Json(LearningPathResponse { learning_path }))
}

/// Replace the session's user context with an enterprise persona.
#[utoipa::path(
    post,
    path = "/advisor/sessions/{id}/persona",
    request_body = ApplyPersonaPayload,
    responses(
        (status = 200, description = "Applied persona; unknown ids resolve to 'default'", body = PersonaInfo)
    ),
    params(("id" = String, Path, description = "Advisor session ID")),
    tag = "advisor"
)]
#[instrument(skip(state, payload))]
pub async fn apply_persona(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<ApplyPersonaPayload>,
) -> Json<PersonaInfo> {
    let _guard = state.locks.acquire(&id).await;
    let mut agent = state.open_advisor(&id);
    let persona = agent.apply_persona(&state.personas, &payload.persona_id);
    Json(PersonaInfo::from(persona))
}

/// List the enterprise personas.
#[utoipa::path(
    get,
    path = "/personas",
    responses((status = 200, description = "Persona catalogue", body = [PersonaInfo])),
    tag = "advisor"
)]
pub async fn list_personas(State(state): State<Arc<AppState>>) -> Json<Vec<PersonaInfo>> {
    Json(state.personas.all().iter().map(PersonaInfo::from).collect())
}

// --- Teacher ---

/// Start teaching a learning path.
///
/// The path is taken from the body, or from the structured path of the given
/// advisor session.
#[utoipa::path(
    post,
    path = "/teacher/sessions",
    request_body = CreateTeacherSessionPayload,
    responses(
        (status = 201, description = "Session created", body = TeacherSessionView),
        (status = 400, description = "No usable learning path", body = ErrorResponse)
    ),
    tag = "teacher"
)]
#[instrument(skip(state, payload))]
pub async fn create_teacher_session(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateTeacherSessionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let learning_path = match (payload.learning_path, payload.advisor_session_id) {
        (Some(path), _) => path,
        (None, Some(advisor_id)) => {
            let _guard = state.locks.acquire(&advisor_id).await;
            state
                .open_advisor(&advisor_id)
                .memory()
                .learning_path
                .clone()
                .ok_or_else(|| {
                    ApiError::BadRequest(format!(
                        "Advisor session '{}' has no generated learning path",
                        advisor_id
                    ))
                })?
        }
        (None, None) => {
            return Err(ApiError::BadRequest(
                "learningPath or advisorSessionId is required".to_string(),
            ));
        }
    };
    learning_path.validate().map_err(ApiError::BadRequest)?;

    let session_id = TeacherRegistry::new(state.store.clone()).create_session(learning_path.clone())?;
    let agent = state.open_teacher(&session_id, Some(learning_path));
    info!(session_id = %session_id, "Created teacher session");
    Ok((StatusCode::CREATED, Json(teacher_view(&agent))))
}

/// List teacher sessions, most recently updated first.
#[utoipa::path(
    get,
    path = "/teacher/sessions",
    responses((status = 200, description = "List of sessions", body = [TeacherSessionSummary])),
    tag = "teacher"
)]
pub async fn list_teacher_sessions(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<TeacherSessionSummary>> {
    let sessions = TeacherRegistry::new(state.store.clone()).all();
    Json(sessions.into_iter().map(Into::into).collect())
}

/// Get a teacher session's progress and conversation.
#[utoipa::path(
    get,
    path = "/teacher/sessions/{id}",
    responses(
        (status = 200, description = "Session details", body = TeacherSessionView),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(("id" = String, Path, description = "Teacher session ID")),
    tag = "teacher"
)]
#[instrument(skip(state))]
pub async fn get_teacher_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TeacherSessionView>, ApiError> {
    let session = TeacherRegistry::new(state.store.clone())
        .get(&id)
        .ok_or_else(|| teacher_not_found(&id))?;
    let _guard = state.locks.acquire(&id).await;
    let agent = state.open_teacher(&id, Some(session.learning_path));
    Ok(Json(teacher_view(&agent)))
}

/// Delete a teacher session.
#[utoipa::path(
    delete,
    path = "/teacher/sessions/{id}",
    responses(
        (status = 204, description = "Session deleted"),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(("id" = String, Path, description = "Teacher session ID")),
    tag = "teacher"
)]
#[instrument(skip(state))]
pub async fn delete_teacher_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let _guard = state.locks.acquire(&id).await;
    TeacherAgent::clear_session(&state.store, &id)?;
    info!(session_id = %id, "Deleted teacher session");
    Ok(StatusCode::NO_CONTENT)
}

/// Send a message to the teacher. The reply is either plain text or a lesson
/// with a quiz question.
#[utoipa::path(
    post,
    path = "/teacher/sessions/{id}/messages",
    request_body = SendMessagePayload,
    responses(
        (status = 200, description = "Teacher reply (type 'text' or 'lesson')", body = TeacherReply),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 502, description = "Completion service failed", body = ErrorResponse)
    ),
    params(("id" = String, Path, description = "Teacher session ID")),
    tag = "teacher"
)]
#[instrument(skip(state, payload))]
pub async fn send_teacher_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<SendMessagePayload>,
) -> Result<Json<TeacherReply>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }
    let session = TeacherRegistry::new(state.store.clone())
        .get(&id)
        .ok_or_else(|| teacher_not_found(&id))?;
    let _guard = state.locks.acquire(&id).await;
    let mut agent = state.open_teacher(&id, Some(session.learning_path));
    let response = agent
        .respond(&payload.message)
        .await
        .map_err(ApiError::from_agent)?;
    Ok(Json(TeacherReply { response }))
}

/// Mark the current course complete and advance.
#[utoipa::path(
    post,
    path = "/teacher/sessions/{id}/complete",
    responses(
        (status = 200, description = "Progress after advancing", body = ProgressResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(("id" = String, Path, description = "Teacher session ID")),
    tag = "teacher"
)]
#[instrument(skip(state))]
pub async fn complete_course(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let session = TeacherRegistry::new(state.store.clone())
        .get(&id)
        .ok_or_else(|| teacher_not_found(&id))?;
    let _guard = state.locks.acquire(&id).await;
    let mut agent = state.open_teacher(&id, Some(session.learning_path));
    let progress = agent.mark_complete().map_err(ApiError::from_agent)?;
    Ok(Json(ProgressResponse { progress }))
}

/// Record the learner's feedback. Omitted fields are left unchanged.
#[utoipa::path(
    patch,
    path = "/teacher/sessions/{id}/feedback",
    request_body = FeedbackPayload,
    responses(
        (status = 200, description = "Session after the update", body = TeacherSessionView),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(("id" = String, Path, description = "Teacher session ID")),
    tag = "teacher"
)]
#[instrument(skip(state, payload))]
pub async fn update_feedback(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<FeedbackPayload>,
) -> Result<Json<TeacherSessionView>, ApiError> {
    let session = TeacherRegistry::new(state.store.clone())
        .get(&id)
        .ok_or_else(|| teacher_not_found(&id))?;
    let _guard = state.locks.acquire(&id).await;
    let mut agent = state.open_teacher(&id, Some(session.learning_path));
    agent.set_feedback(&FeedbackUpdate::from(payload));
    Ok(Json(teacher_view(&agent)))
}

// --- Storage ---

/// Export every application key as a versioned JSON document.
#[utoipa::path(
    get,
    path = "/storage/export",
    responses(
        (status = 200, description = "Export document", body = String, content_type = "application/json"),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "storage"
)]
pub async fn export_storage(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let document = StorageManager::new(state.store.clone()).export_all()?;
    Ok(([(header::CONTENT_TYPE, "application/json")], document).into_response())
}

/// Import an export document. `mode=replace` clears application keys first.
#[utoipa::path(
    post,
    path = "/storage/import",
    request_body(content = String, content_type = "application/json", description = "An export document"),
    responses(
        (status = 200, description = "Number of keys written", body = ImportResult),
        (status = 400, description = "Invalid document or mode", body = ErrorResponse)
    ),
    params(("mode" = Option<String>, Query, description = "merge (default) or replace")),
    tag = "storage"
)]
#[instrument(skip(state, body))]
pub async fn import_storage(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ImportParams>,
    body: String,
) -> Result<Json<ImportResult>, ApiError> {
    let mode = match params.mode.as_deref() {
        None | Some("merge") => ImportMode::Merge,
        Some("replace") => ImportMode::Replace,
        Some(other) => {
            return Err(ApiError::BadRequest(format!("unknown import mode '{}'", other)));
        }
    };
    match StorageManager::new(state.store.clone()).import_all(&body, mode) {
        Ok(imported) => Ok(Json(ImportResult { imported })),
        Err(e @ (BackupError::Parse(_) | BackupError::InvalidFormat(_))) => {
            warn!(error = %e, "Rejected import");
            Err(ApiError::BadRequest(e.to_string()))
        }
        Err(BackupError::Storage(e)) => Err(e.into()),
    }
}

/// Remove every application key.
#[utoipa::path(
    delete,
    path = "/storage",
    responses(
        (status = 204, description = "Storage cleared"),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "storage"
)]
pub async fn clear_storage(State(state): State<Arc<AppState>>) -> Result<StatusCode, ApiError> {
    StorageManager::new(state.store.clone()).clear_all()?;
    Ok(StatusCode::NO_CONTENT)
}

/// Key counts and total stored size.
#[utoipa::path(
    get,
    path = "/storage/summary",
    responses(
        (status = 200, description = "Storage summary", body = StorageSummaryResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "storage"
)]
pub async fn storage_summary(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StorageSummaryResponse>, ApiError> {
    let summary = StorageManager::new(state.store.clone()).summary()?;
    Ok(Json(summary.into()))
}
