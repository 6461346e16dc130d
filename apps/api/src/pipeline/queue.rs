//! Durable task queue backed by the `pipeline_jobs` table. Workers claim due
//! jobs with `FOR UPDATE SKIP LOCKED`, so any number of workers can poll the
//! same table without double-running a job. Stages communicate only through
//! persisted records; the payload carries ids, never data.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::errors::AppError;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ExtractResume,
    ScoreResume,
    ExplainResumeScore,
    ComputeCompatibility,
    ExplainCompatibility,
    ComputeJobMatch,
    SkillGapAnalysis,
    ExtractCredentials,
    VerifyCredential,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ExtractResume => "extract-resume",
            Stage::ScoreResume => "score-resume",
            Stage::ExplainResumeScore => "explain-resume-score",
            Stage::ComputeCompatibility => "compute-compatibility",
            Stage::ExplainCompatibility => "explain-compatibility",
            Stage::ComputeJobMatch => "compute-job-match",
            Stage::SkillGapAnalysis => "skill-gap-analysis",
            Stage::ExtractCredentials => "extract-credentials",
            Stage::VerifyCredential => "verify-credential",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "extract-resume" => Some(Stage::ExtractResume),
            "score-resume" => Some(Stage::ScoreResume),
            "explain-resume-score" => Some(Stage::ExplainResumeScore),
            "compute-compatibility" => Some(Stage::ComputeCompatibility),
            "explain-compatibility" => Some(Stage::ExplainCompatibility),
            "compute-job-match" => Some(Stage::ComputeJobMatch),
            "skill-gap-analysis" => Some(Stage::SkillGapAnalysis),
            "extract-credentials" => Some(Stage::ExtractCredentials),
            "verify-credential" => Some(Stage::VerifyCredential),
            _ => None,
        }
    }
}

/// Delay schedule between attempts, persisted as `fixed:N` / `linear:N`
/// (seconds) on the job row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(u64),
    Linear(u64),
}

impl Backoff {
    pub fn parse(s: &str) -> Option<Self> {
        let (kind, secs) = s.split_once(':')?;
        let secs: u64 = secs.parse().ok()?;
        match kind {
            "fixed" => Some(Backoff::Fixed(secs)),
            "linear" => Some(Backoff::Linear(secs)),
            _ => None,
        }
    }

    pub fn encode(&self) -> String {
        match self {
            Backoff::Fixed(s) => format!("fixed:{s}"),
            Backoff::Linear(s) => format!("linear:{s}"),
        }
    }

    /// Delay before the given (1-based) retry attempt.
    pub fn delay_for(&self, attempt: i32) -> Duration {
        let attempt = attempt.max(1) as u64;
        match self {
            Backoff::Fixed(s) => Duration::from_secs(*s),
            Backoff::Linear(s) => Duration::from_secs(s * attempt),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobOptions {
    pub delay: Option<Duration>,
    pub max_attempts: i32,
    pub backoff: Backoff,
}

impl Default for JobOptions {
    fn default() -> Self {
        JobOptions {
            delay: None,
            max_attempts: 3,
            backoff: Backoff::Fixed(10),
        }
    }
}

impl JobOptions {
    pub fn delayed(delay: Duration) -> Self {
        JobOptions {
            delay: Some(delay),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PipelineJobRow {
    pub id: Uuid,
    pub stage: String,
    pub payload: Value,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub backoff: String,
    pub run_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One pipeline stage. Implementations are thin adapters that load their
/// records by id, run the engine, and persist the result.
#[async_trait]
pub trait StageHandler: Send + Sync {
    async fn run(&self, payload: Value) -> Result<(), AppError>;
}

pub type HandlerMap = HashMap<&'static str, Arc<dyn StageHandler>>;

/// Cheap cloneable handle for submitting work.
#[derive(Clone)]
pub struct Queue {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl Queue {
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    pub async fn enqueue(
        &self,
        stage: Stage,
        payload: Value,
        options: JobOptions,
    ) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();
        let run_at = self.clock.now()
            + chrono::Duration::from_std(options.delay.unwrap_or_default())
                .unwrap_or_else(|_| chrono::Duration::zero());
        sqlx::query(
            r#"
            INSERT INTO pipeline_jobs (id, stage, payload, max_attempts, backoff, run_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(stage.as_str())
        .bind(&payload)
        .bind(options.max_attempts)
        .bind(options.backoff.encode())
        .bind(run_at)
        .execute(&self.pool)
        .await?;
        debug!(job_id = %id, stage = stage.as_str(), %run_at, "enqueued pipeline job");
        Ok(id)
    }
}

/// Claims the oldest due job, marking it running and charging an attempt.
async fn claim_next(pool: &PgPool) -> Result<Option<PipelineJobRow>, sqlx::Error> {
    sqlx::query_as::<_, PipelineJobRow>(
        r#"
        UPDATE pipeline_jobs SET status = 'running', attempts = attempts + 1, updated_at = now()
        WHERE id = (
            SELECT id FROM pipeline_jobs
            WHERE status = 'queued' AND run_at <= now()
            ORDER BY run_at
            LIMIT 1
            FOR UPDATE SKIP LOCKED
        )
        RETURNING *
        "#,
    )
    .fetch_optional(pool)
    .await
}

async fn settle(pool: &PgPool, job: &PipelineJobRow, outcome: Result<(), AppError>) {
    let result = match outcome {
        Ok(()) => {
            sqlx::query("UPDATE pipeline_jobs SET status = 'done', updated_at = now() WHERE id = $1")
                .bind(job.id)
                .execute(pool)
                .await
        }
        Err(e) => {
            let reason = e.to_string();
            if job.attempts >= job.max_attempts {
                error!(
                    job_id = %job.id,
                    stage = %job.stage,
                    attempts = job.attempts,
                    error = %reason,
                    "pipeline job failed permanently"
                );
                sqlx::query(
                    "UPDATE pipeline_jobs SET status = 'failed', last_error = $2, updated_at = now() WHERE id = $1",
                )
                .bind(job.id)
                .bind(&reason)
                .execute(pool)
                .await
            } else {
                let backoff = Backoff::parse(&job.backoff).unwrap_or(Backoff::Fixed(10));
                let delay = backoff.delay_for(job.attempts);
                warn!(
                    job_id = %job.id,
                    stage = %job.stage,
                    attempt = job.attempts,
                    retry_in_secs = delay.as_secs(),
                    error = %reason,
                    "pipeline job failed, requeueing"
                );
                sqlx::query(
                    r#"
                    UPDATE pipeline_jobs
                    SET status = 'queued', last_error = $2,
                        run_at = now() + make_interval(secs => $3),
                        updated_at = now()
                    WHERE id = $1
                    "#,
                )
                .bind(job.id)
                .bind(&reason)
                .bind(delay.as_secs() as f64)
                .execute(pool)
                .await
            }
        }
    };
    if let Err(e) = result {
        error!(job_id = %job.id, "failed to settle pipeline job: {e}");
    }
}

/// Worker loop. Runs until the process exits; every iteration claims at most
/// one job and settles it.
pub async fn run_worker(pool: PgPool, handlers: Arc<HandlerMap>, worker_id: usize) {
    info!(worker_id, "pipeline worker started");
    loop {
        let job = match claim_next(&pool).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                tokio::time::sleep(POLL_INTERVAL).await;
                continue;
            }
            Err(e) => {
                error!(worker_id, "failed to claim pipeline job: {e}");
                tokio::time::sleep(POLL_INTERVAL).await;
                continue;
            }
        };

        debug!(worker_id, job_id = %job.id, stage = %job.stage, attempt = job.attempts, "running stage");
        let outcome = match handlers.get(job.stage.as_str()) {
            Some(handler) => handler.run(job.payload.clone()).await,
            None => Err(AppError::Validation(format!(
                "no handler registered for stage '{}'",
                job.stage
            ))),
        };
        settle(&pool, &job, outcome).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_round_trip() {
        for stage in [
            Stage::ExtractResume,
            Stage::ScoreResume,
            Stage::ExplainResumeScore,
            Stage::ComputeCompatibility,
            Stage::ExplainCompatibility,
            Stage::ComputeJobMatch,
            Stage::SkillGapAnalysis,
            Stage::ExtractCredentials,
            Stage::VerifyCredential,
        ] {
            assert_eq!(Stage::parse(stage.as_str()), Some(stage));
        }
        assert_eq!(Stage::parse("nope"), None);
    }

    #[test]
    fn test_backoff_parse_and_encode() {
        assert_eq!(Backoff::parse("fixed:10"), Some(Backoff::Fixed(10)));
        assert_eq!(Backoff::parse("linear:30"), Some(Backoff::Linear(30)));
        assert_eq!(Backoff::parse("exponential:2"), None);
        assert_eq!(Backoff::parse("fixed"), None);
        assert_eq!(Backoff::Linear(30).encode(), "linear:30");
    }

    #[test]
    fn test_fixed_backoff_is_flat() {
        let b = Backoff::Fixed(10);
        assert_eq!(b.delay_for(1), Duration::from_secs(10));
        assert_eq!(b.delay_for(3), Duration::from_secs(10));
    }

    #[test]
    fn test_linear_backoff_grows_per_attempt() {
        let b = Backoff::Linear(30);
        assert_eq!(b.delay_for(1), Duration::from_secs(30));
        assert_eq!(b.delay_for(2), Duration::from_secs(60));
        assert_eq!(b.delay_for(3), Duration::from_secs(90));
    }

    #[test]
    fn test_default_job_options() {
        let opts = JobOptions::default();
        assert_eq!(opts.max_attempts, 3);
        assert_eq!(opts.backoff, Backoff::Fixed(10));
        assert!(opts.delay.is_none());
    }
}
