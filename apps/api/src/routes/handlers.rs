//! HTTP handlers: enqueue pipelines, review credentials, and read back
//! persisted results. Handlers never run an engine inline; every computation
//! goes through the queue.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::credentials::verifier::{self, ReviewDecision};
use crate::errors::AppError;
use crate::models::credential::get_credential;
use crate::models::matching::{get_match, get_score, get_skill_gap};
use crate::state::AppState;

fn enqueued(job_id: Uuid) -> Json<Value> {
    Json(json!({ "status": "queued", "job_id": job_id }))
}

// ─────────────────────────────────────────────────────────────
// Pipeline triggers
// ─────────────────────────────────────────────────────────────

/// POST /api/v1/resumes/:id/analyze
pub async fn handle_analyze_resume(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let job_id = state.orchestrator.start_resume_analysis(resume_id).await?;
    Ok(enqueued(job_id))
}

/// POST /api/v1/resumes/:id/compatibility/:job_id
pub async fn handle_compatibility(
    State(state): State<AppState>,
    Path((resume_id, job_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    let queued = state
        .orchestrator
        .start_candidate_evaluation(resume_id, job_id)
        .await?;
    Ok(enqueued(queued))
}

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    /// Omit to match against every active job.
    pub job_id: Option<Uuid>,
}

/// POST /api/v1/resumes/:id/match
pub async fn handle_job_match(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
    Json(body): Json<MatchRequest>,
) -> Result<Json<Value>, AppError> {
    let queued = state
        .orchestrator
        .start_job_match(resume_id, body.job_id)
        .await?;
    Ok(enqueued(queued))
}

#[derive(Debug, Deserialize)]
pub struct SkillGapRequest {
    pub target_role: String,
    pub target_skills: Option<Vec<String>>,
}

/// POST /api/v1/resumes/:id/skill-gap
pub async fn handle_skill_gap(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
    Json(body): Json<SkillGapRequest>,
) -> Result<Json<Value>, AppError> {
    if body.target_role.trim().is_empty() {
        return Err(AppError::Validation("target_role must not be empty".to_string()));
    }
    let queued = state
        .orchestrator
        .start_skill_gap(resume_id, body.target_role, body.target_skills)
        .await?;
    Ok(enqueued(queued))
}

/// POST /api/v1/resumes/:id/credentials
pub async fn handle_extract_credentials(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let queued = state
        .orchestrator
        .start_certificate_pipeline(resume_id)
        .await?;
    Ok(enqueued(queued))
}

/// POST /api/v1/credentials/:id/verify
pub async fn handle_verify_credential(
    State(state): State<AppState>,
    Path(credential_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    get_credential(&state.db, credential_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("credential {credential_id}")))?;
    let queued = state
        .orchestrator
        .start_certificate_verification(credential_id)
        .await?;
    Ok(enqueued(queued))
}

// ─────────────────────────────────────────────────────────────
// Credential review
// ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub decision: ReviewDecision,
    pub reviewer: String,
    pub notes: Option<String>,
}

/// POST /api/v1/credentials/:id/review
pub async fn handle_review_credential(
    State(state): State<AppState>,
    Path(credential_id): Path<Uuid>,
    Json(body): Json<ReviewRequest>,
) -> Result<Json<Value>, AppError> {
    if body.reviewer.trim().is_empty() {
        return Err(AppError::Validation("reviewer must not be empty".to_string()));
    }
    let updated = verifier::review(
        &state.db,
        state.clock.as_ref(),
        credential_id,
        body.decision,
        &body.reviewer,
        body.notes.as_deref(),
    )
    .await?;
    Ok(Json(json!(updated)))
}

// ─────────────────────────────────────────────────────────────
// Read-back
// ─────────────────────────────────────────────────────────────

/// GET /api/v1/resumes/:id/score
pub async fn handle_get_score(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let score = get_score(&state.db, resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("score for resume {resume_id}")))?;
    Ok(Json(json!(score)))
}

/// GET /api/v1/resumes/:id/match/:job_id
pub async fn handle_get_match(
    State(state): State<AppState>,
    Path((resume_id, job_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    let matched = get_match(&state.db, resume_id, job_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("match for resume {resume_id} and job {job_id}"))
        })?;
    Ok(Json(json!(matched)))
}

/// GET /api/v1/resumes/:id/skill-gap/:role
pub async fn handle_get_skill_gap(
    State(state): State<AppState>,
    Path((resume_id, target_role)): Path<(Uuid, String)>,
) -> Result<Json<Value>, AppError> {
    let report = get_skill_gap(&state.db, resume_id, &target_role)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("skill gap report for resume {resume_id}"))
        })?;
    Ok(Json(json!(report)))
}

/// GET /api/v1/credentials/:id
pub async fn handle_get_credential(
    State(state): State<AppState>,
    Path(credential_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let credential = get_credential(&state.db, credential_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("credential {credential_id}")))?;
    Ok(Json(json!(credential)))
}
