pub mod handlers;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Pipeline triggers
        .route(
            "/api/v1/resumes/:id/analyze",
            post(handlers::handle_analyze_resume),
        )
        .route(
            "/api/v1/resumes/:id/compatibility/:job_id",
            post(handlers::handle_compatibility),
        )
        .route("/api/v1/resumes/:id/match", post(handlers::handle_job_match))
        .route(
            "/api/v1/resumes/:id/skill-gap",
            post(handlers::handle_skill_gap),
        )
        .route(
            "/api/v1/resumes/:id/credentials",
            post(handlers::handle_extract_credentials),
        )
        .route(
            "/api/v1/credentials/:id/verify",
            post(handlers::handle_verify_credential),
        )
        // Human review
        .route(
            "/api/v1/credentials/:id/review",
            post(handlers::handle_review_credential),
        )
        // Read-back
        .route("/api/v1/resumes/:id/score", get(handlers::handle_get_score))
        .route(
            "/api/v1/resumes/:id/match/:job_id",
            get(handlers::handle_get_match),
        )
        .route(
            "/api/v1/resumes/:id/skill-gap/:role",
            get(handlers::handle_get_skill_gap),
        )
        .route(
            "/api/v1/credentials/:id",
            get(handlers::handle_get_credential),
        )
        .with_state(state)
}
