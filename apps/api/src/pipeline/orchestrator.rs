//! Pipeline entry points. The orchestrator owns sequencing, not data: it
//! enqueues the first stage of each pipeline and lets the stage handlers
//! chain the rest through persisted records.

use serde_json::json;
use uuid::Uuid;

use crate::errors::AppError;
use crate::pipeline::queue::{Backoff, JobOptions, Queue, Stage};
use crate::pipeline::stages::{
    CredentialPayload, JobMatchPayload, PairPayload, ResumePayload, SkillGapPayload,
};

/// Retry policy for issuer verification calls. Issuer endpoints are the
/// flakiest external dependency, so retries back off linearly rather than
/// hammering at a fixed interval.
pub fn verification_options() -> JobOptions {
    JobOptions {
        delay: None,
        max_attempts: 3,
        backoff: Backoff::Linear(30),
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    queue: Queue,
}

impl Orchestrator {
    pub fn new(queue: Queue) -> Self {
        Self { queue }
    }

    /// Resume analysis: extraction, then scoring, then (optionally, delayed)
    /// the score narrative.
    pub async fn start_resume_analysis(&self, resume_id: Uuid) -> Result<Uuid, AppError> {
        self.queue
            .enqueue(
                Stage::ExtractResume,
                json!(ResumePayload { resume_id }),
                JobOptions::default(),
            )
            .await
    }

    /// Candidate evaluation: compatibility for one (resume, job) pair, then
    /// (optionally, delayed) the match narrative.
    pub async fn start_candidate_evaluation(
        &self,
        resume_id: Uuid,
        job_id: Uuid,
    ) -> Result<Uuid, AppError> {
        self.queue
            .enqueue(
                Stage::ComputeCompatibility,
                json!(PairPayload { resume_id, job_id }),
                JobOptions::default(),
            )
            .await
    }

    /// Numeric job match, for one job or for every active job when `job_id`
    /// is absent.
    pub async fn start_job_match(
        &self,
        resume_id: Uuid,
        job_id: Option<Uuid>,
    ) -> Result<Uuid, AppError> {
        self.queue
            .enqueue(
                Stage::ComputeJobMatch,
                json!(JobMatchPayload { resume_id, job_id }),
                JobOptions::default(),
            )
            .await
    }

    pub async fn start_skill_gap(
        &self,
        resume_id: Uuid,
        target_role: String,
        target_skills: Option<Vec<String>>,
    ) -> Result<Uuid, AppError> {
        self.queue
            .enqueue(
                Stage::SkillGapAnalysis,
                json!(SkillGapPayload {
                    resume_id,
                    target_role,
                    target_skills,
                }),
                JobOptions::default(),
            )
            .await
    }

    /// Certificate pipeline: derive credential rows from the canonical
    /// resume's certifications, then verify each one.
    pub async fn start_certificate_pipeline(&self, resume_id: Uuid) -> Result<Uuid, AppError> {
        self.queue
            .enqueue(
                Stage::ExtractCredentials,
                json!(ResumePayload { resume_id }),
                JobOptions::default(),
            )
            .await
    }

    /// Verification for a single, already-extracted credential.
    pub async fn start_certificate_verification(
        &self,
        credential_id: Uuid,
    ) -> Result<Uuid, AppError> {
        self.queue
            .enqueue(
                Stage::VerifyCredential,
                json!(CredentialPayload { credential_id }),
                verification_options(),
            )
            .await
    }
}
