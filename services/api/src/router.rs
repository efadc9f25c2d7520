//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the advisor, teacher and storage endpoints and the OpenAPI
//! documentation.

use crate::{
    handlers,
    models::{
        AdvisorReply, AdvisorSessionCreated, AdvisorSessionSummary, AdvisorSessionView,
        ApplyPersonaPayload, CreateTeacherSessionPayload, ErrorResponse, FeedbackPayload,
        ImportResult, LearningPathResponse, Message, PersonaInfo, ProgressResponse,
        SendMessagePayload, StorageSummaryResponse, TeacherReply, TeacherSessionSummary,
        TeacherSessionView,
    },
    state::AppState,
};

use axum::{
    Router,
    routing::{delete, get, patch, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_advisor_session,
        handlers::list_advisor_sessions,
        handlers::recent_advisor_session,
        handlers::get_advisor_session,
        handlers::delete_advisor_session,
        handlers::send_advisor_message,
        handlers::generate_learning_path,
        handlers::apply_persona,
        handlers::list_personas,
        handlers::create_teacher_session,
        handlers::list_teacher_sessions,
        handlers::get_teacher_session,
        handlers::delete_teacher_session,
        handlers::send_teacher_message,
        handlers::complete_course,
        handlers::update_feedback,
        handlers::export_storage,
        handlers::import_storage,
        handlers::clear_storage,
        handlers::storage_summary,
    ),
    components(
        schemas(
            Message, AdvisorSessionCreated, AdvisorSessionSummary, AdvisorSessionView,
            SendMessagePayload, AdvisorReply, LearningPathResponse, ApplyPersonaPayload,
            PersonaInfo, CreateTeacherSessionPayload, TeacherSessionSummary, TeacherSessionView,
            TeacherReply, ProgressResponse, FeedbackPayload, ImportResult,
            StorageSummaryResponse, ErrorResponse
        )
    ),
    tags(
        (name = "advisor", description = "Profile-gathering conversations that produce a learning path"),
        (name = "teacher", description = "Lessons along a learning path with progress tracking"),
        (name = "storage", description = "Bulk export, import and housekeeping")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route(
            "/advisor/sessions",
            get(handlers::list_advisor_sessions).post(handlers::create_advisor_session),
        )
        .route("/advisor/sessions/recent", get(handlers::recent_advisor_session))
        .route(
            "/advisor/sessions/{id}",
            get(handlers::get_advisor_session).delete(handlers::delete_advisor_session),
        )
        .route(
            "/advisor/sessions/{id}/messages",
            post(handlers::send_advisor_message),
        )
        .route(
            "/advisor/sessions/{id}/learning-path",
            post(handlers::generate_learning_path),
        )
        .route("/advisor/sessions/{id}/persona", post(handlers::apply_persona))
        .route("/personas", get(handlers::list_personas))
        .route(
            "/teacher/sessions",
            get(handlers::list_teacher_sessions).post(handlers::create_teacher_session),
        )
        .route(
            "/teacher/sessions/{id}",
            get(handlers::get_teacher_session).delete(handlers::delete_teacher_session),
        )
        .route(
            "/teacher/sessions/{id}/messages",
            post(handlers::send_teacher_message),
        )
        .route(
            "/teacher/sessions/{id}/complete",
            post(handlers::complete_course),
        )
        .route(
            "/teacher/sessions/{id}/feedback",
            patch(handlers::update_feedback),
        )
        .route("/storage", delete(handlers::clear_storage))
        .route("/storage/export", get(handlers::export_storage))
        .route("/storage/import", post(handlers::import_storage))
        .route("/storage/summary", get(handlers::storage_summary))
        // Apply the state ONLY to this group of routes.
        .with_state(app_state);

    // Create the final router that merges the stateful routes
    // with the stateless routes (like Swagger UI).
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
