//! Stage handlers: thin adapters between the queue and the engines. Each
//! handler loads its records by id, runs the pure engine, persists the
//! result, and (where the pipeline continues) enqueues the next stage.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::credentials::{extractor, verifier};
use crate::errors::AppError;
use crate::explain::ExplanationAdapter;
use crate::extraction::{DocumentInput, ExtractionChain};
use crate::models::job::{get_job, list_active_jobs};
use crate::models::matching::get_resume;
use crate::models::resume::{CanonicalResume, ResumeRow};
use crate::pipeline::orchestrator::verification_options;
use crate::pipeline::queue::{HandlerMap, JobOptions, Queue, Stage, StageHandler};
use crate::scoring::weights::{CompatibilityWeights, MatchWeights, QualityWeights};
use crate::scoring::{compatibility, job_match, quality, skill_gap};
use crate::storage::DocumentStore;

const MATCH_ALL_JOBS_CAP: i64 = 100;

#[derive(Debug, Serialize, Deserialize)]
pub struct ResumePayload {
    pub resume_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PairPayload {
    pub resume_id: Uuid,
    pub job_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JobMatchPayload {
    pub resume_id: Uuid,
    /// When absent, all active jobs are matched.
    pub job_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SkillGapPayload {
    pub resume_id: Uuid,
    pub target_role: String,
    /// Explicit target skills override role-based derivation.
    pub target_skills: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CredentialPayload {
    pub credential_id: Uuid,
}

fn decode<T: serde::de::DeserializeOwned>(payload: Value) -> Result<T, AppError> {
    serde_json::from_value(payload).map_err(|e| AppError::Validation(format!("bad payload: {e}")))
}

async fn load_resume(pool: &PgPool, resume_id: Uuid) -> Result<ResumeRow, AppError> {
    get_resume(pool, resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("resume {resume_id}")))
}

/// Canonical data is a hard dependency for every scorer; a resume that never
/// went through extraction cannot be scored.
fn require_canonical(row: &ResumeRow) -> Result<CanonicalResume, AppError> {
    row.canonical_resume().ok_or_else(|| {
        AppError::Validation(format!("resume {} has no canonical data", row.id))
    })
}

// ─────────────────────────────────────────────────────────────
// Resume analysis stages
// ─────────────────────────────────────────────────────────────

pub struct ExtractResumeHandler {
    pub pool: PgPool,
    pub storage: DocumentStore,
    pub chain: ExtractionChain,
    pub clock: Arc<dyn Clock>,
    pub queue: Queue,
}

#[async_trait]
impl StageHandler for ExtractResumeHandler {
    async fn run(&self, payload: Value) -> Result<(), AppError> {
        let ResumePayload { resume_id } = decode(payload)?;
        let row = load_resume(&self.pool, resume_id).await?;

        // A fetch failure degrades to the stored-data fallback rather than
        // failing the stage; partial extraction still feeds the scorer.
        let bytes = match &row.document_key {
            Some(key) if self.storage.exists(key).await => match self.storage.fetch(key).await {
                Ok(b) => Some(b),
                Err(e) => {
                    warn!(resume_id = %resume_id, "document fetch failed, falling back: {e}");
                    None
                }
            },
            Some(key) => {
                warn!(resume_id = %resume_id, %key, "document missing from storage");
                None
            }
            None => None,
        };

        let input = DocumentInput {
            bytes,
            file_name: row.file_name.as_deref(),
            stored_profile: row.stored_profile.as_ref(),
        };
        let resume = self.chain.extract(&input, self.clock.as_ref()).await;

        sqlx::query(
            r#"
            UPDATE resumes
            SET canonical = $2, source = $3, extracted_at = $4, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(resume_id)
        .bind(json!(resume))
        .bind(resume.source.as_str())
        .bind(resume.extracted_at)
        .execute(&self.pool)
        .await?;
        info!(resume_id = %resume_id, source = ?resume.source, usable = resume.is_usable(), "resume extracted");

        self.queue
            .enqueue(
                Stage::ScoreResume,
                json!(ResumePayload { resume_id }),
                JobOptions::default(),
            )
            .await?;
        Ok(())
    }
}

pub struct ScoreResumeHandler {
    pub pool: PgPool,
    pub clock: Arc<dyn Clock>,
    pub queue: Queue,
    pub explanations_enabled: bool,
    pub explain_delay: Duration,
}

#[async_trait]
impl StageHandler for ScoreResumeHandler {
    async fn run(&self, payload: Value) -> Result<(), AppError> {
        let ResumePayload { resume_id } = decode(payload)?;
        let row = load_resume(&self.pool, resume_id).await?;
        let resume = require_canonical(&row)?;

        let score = quality::score(&resume, self.clock.as_ref(), &QualityWeights::default());
        info!(resume_id = %resume_id, overall = score.overall, "resume scored");
        quality::persist_score(&self.pool, resume_id, &score).await?;

        if self.explanations_enabled {
            self.queue
                .enqueue(
                    Stage::ExplainResumeScore,
                    json!(ResumePayload { resume_id }),
                    JobOptions::delayed(self.explain_delay),
                )
                .await?;
        }
        Ok(())
    }
}

pub struct ExplainResumeScoreHandler {
    pub adapter: Arc<ExplanationAdapter>,
}

#[async_trait]
impl StageHandler for ExplainResumeScoreHandler {
    async fn run(&self, payload: Value) -> Result<(), AppError> {
        let ResumePayload { resume_id } = decode(payload)?;
        self.adapter.explain_score(resume_id).await
    }
}

// ─────────────────────────────────────────────────────────────
// Candidate evaluation stages
// ─────────────────────────────────────────────────────────────

pub struct ComputeCompatibilityHandler {
    pub pool: PgPool,
    pub clock: Arc<dyn Clock>,
    pub queue: Queue,
    pub explanations_enabled: bool,
    pub explain_delay: Duration,
}

#[async_trait]
impl StageHandler for ComputeCompatibilityHandler {
    async fn run(&self, payload: Value) -> Result<(), AppError> {
        let PairPayload { resume_id, job_id } = decode(payload)?;
        let row = load_resume(&self.pool, resume_id).await?;
        let resume = require_canonical(&row)?;
        let job = get_job(&self.pool, job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("job {job_id}")))?;

        let score = compatibility::compatibility(
            &resume,
            &job,
            self.clock.as_ref(),
            &CompatibilityWeights::default(),
        );
        info!(
            resume_id = %resume_id,
            job_id = %job_id,
            level = score.level.as_str(),
            total = score.total,
            "compatibility computed"
        );
        compatibility::persist_compatibility(&self.pool, resume_id, job_id, &score, self.clock.now())
            .await?;

        if self.explanations_enabled {
            self.queue
                .enqueue(
                    Stage::ExplainCompatibility,
                    json!(PairPayload { resume_id, job_id }),
                    JobOptions::delayed(self.explain_delay),
                )
                .await?;
        }
        Ok(())
    }
}

pub struct ExplainCompatibilityHandler {
    pub adapter: Arc<ExplanationAdapter>,
}

#[async_trait]
impl StageHandler for ExplainCompatibilityHandler {
    async fn run(&self, payload: Value) -> Result<(), AppError> {
        let PairPayload { resume_id, job_id } = decode(payload)?;
        self.adapter.explain_compatibility(resume_id, job_id).await
    }
}

// ─────────────────────────────────────────────────────────────
// Job match and skill gap stages
// ─────────────────────────────────────────────────────────────

pub struct ComputeJobMatchHandler {
    pub pool: PgPool,
    pub clock: Arc<dyn Clock>,
}

#[async_trait]
impl StageHandler for ComputeJobMatchHandler {
    async fn run(&self, payload: Value) -> Result<(), AppError> {
        let JobMatchPayload { resume_id, job_id } = decode(payload)?;
        let row = load_resume(&self.pool, resume_id).await?;
        let resume = require_canonical(&row)?;

        let jobs = match job_id {
            Some(job_id) => vec![get_job(&self.pool, job_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("job {job_id}")))?],
            None => list_active_jobs(&self.pool, MATCH_ALL_JOBS_CAP).await?,
        };

        for job in &jobs {
            let score =
                job_match::match_score(&resume, job, self.clock.as_ref(), &MatchWeights::default());
            job_match::persist_match(&self.pool, resume_id, job.id, &score, self.clock.now())
                .await?;
        }
        info!(resume_id = %resume_id, jobs = jobs.len(), "job match computed");
        Ok(())
    }
}

pub struct SkillGapHandler {
    pub pool: PgPool,
    pub clock: Arc<dyn Clock>,
}

#[async_trait]
impl StageHandler for SkillGapHandler {
    async fn run(&self, payload: Value) -> Result<(), AppError> {
        let SkillGapPayload {
            resume_id,
            target_role,
            target_skills,
        } = decode(payload)?;
        let row = load_resume(&self.pool, resume_id).await?;
        let resume = require_canonical(&row)?;

        let target = match target_skills {
            Some(skills) if !skills.is_empty() => skills,
            _ => skill_gap::derive_target_skills(&self.pool, &target_role).await?,
        };
        let report = skill_gap::gap(&resume.skill_names(), &target);
        info!(
            resume_id = %resume_id,
            target_role = %target_role,
            coverage = report.coverage,
            "skill gap analyzed"
        );
        skill_gap::persist_report(&self.pool, resume_id, &target_role, &report, self.clock.now())
            .await?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────
// Certificate stages
// ─────────────────────────────────────────────────────────────

pub struct ExtractCredentialsHandler {
    pub pool: PgPool,
    pub queue: Queue,
}

#[async_trait]
impl StageHandler for ExtractCredentialsHandler {
    async fn run(&self, payload: Value) -> Result<(), AppError> {
        let ResumePayload { resume_id } = decode(payload)?;
        let row = load_resume(&self.pool, resume_id).await?;
        let resume = require_canonical(&row)?;

        let pending = extractor::extract_credentials(&self.pool, resume_id, &resume).await?;
        info!(
            resume_id = %resume_id,
            certifications = resume.certifications.len(),
            pending = pending.len(),
            "credentials extracted"
        );
        for credential_id in pending {
            self.queue
                .enqueue(
                    Stage::VerifyCredential,
                    json!(CredentialPayload { credential_id }),
                    verification_options(),
                )
                .await?;
        }
        Ok(())
    }
}

pub struct VerifyCredentialHandler {
    pub pool: PgPool,
    pub http: reqwest::Client,
    pub clock: Arc<dyn Clock>,
}

#[async_trait]
impl StageHandler for VerifyCredentialHandler {
    async fn run(&self, payload: Value) -> Result<(), AppError> {
        let CredentialPayload { credential_id } = decode(payload)?;
        verifier::run_verification(&self.pool, &self.http, self.clock.as_ref(), credential_id)
            .await?;
        Ok(())
    }
}

/// Everything the handlers need, bundled once at startup.
pub struct StageDeps {
    pub pool: PgPool,
    pub storage: DocumentStore,
    pub chain: ExtractionChain,
    pub adapter: Arc<ExplanationAdapter>,
    pub queue: Queue,
    pub clock: Arc<dyn Clock>,
    pub http: reqwest::Client,
    pub explanations_enabled: bool,
    pub explain_delay: Duration,
}

pub fn build_handlers(deps: StageDeps) -> HandlerMap {
    let mut map: HandlerMap = HandlerMap::new();
    map.insert(
        Stage::ExtractResume.as_str(),
        Arc::new(ExtractResumeHandler {
            pool: deps.pool.clone(),
            storage: deps.storage,
            chain: deps.chain,
            clock: deps.clock.clone(),
            queue: deps.queue.clone(),
        }),
    );
    map.insert(
        Stage::ScoreResume.as_str(),
        Arc::new(ScoreResumeHandler {
            pool: deps.pool.clone(),
            clock: deps.clock.clone(),
            queue: deps.queue.clone(),
            explanations_enabled: deps.explanations_enabled,
            explain_delay: deps.explain_delay,
        }),
    );
    map.insert(
        Stage::ExplainResumeScore.as_str(),
        Arc::new(ExplainResumeScoreHandler {
            adapter: deps.adapter.clone(),
        }),
    );
    map.insert(
        Stage::ComputeCompatibility.as_str(),
        Arc::new(ComputeCompatibilityHandler {
            pool: deps.pool.clone(),
            clock: deps.clock.clone(),
            queue: deps.queue.clone(),
            explanations_enabled: deps.explanations_enabled,
            explain_delay: deps.explain_delay,
        }),
    );
    map.insert(
        Stage::ExplainCompatibility.as_str(),
        Arc::new(ExplainCompatibilityHandler {
            adapter: deps.adapter,
        }),
    );
    map.insert(
        Stage::ComputeJobMatch.as_str(),
        Arc::new(ComputeJobMatchHandler {
            pool: deps.pool.clone(),
            clock: deps.clock.clone(),
        }),
    );
    map.insert(
        Stage::SkillGapAnalysis.as_str(),
        Arc::new(SkillGapHandler {
            pool: deps.pool.clone(),
            clock: deps.clock.clone(),
        }),
    );
    map.insert(
        Stage::ExtractCredentials.as_str(),
        Arc::new(ExtractCredentialsHandler {
            pool: deps.pool.clone(),
            queue: deps.queue.clone(),
        }),
    );
    map.insert(
        Stage::VerifyCredential.as_str(),
        Arc::new(VerifyCredentialHandler {
            pool: deps.pool,
            http: deps.http,
            clock: deps.clock,
        }),
    );
    map
}
