use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Coarse HIGH/MEDIUM/LOW classification of resume-vs-job fit.
/// Distinct from the finer-grained numeric match score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompatibilityLevel {
    High,
    Medium,
    Low,
}

impl CompatibilityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompatibilityLevel::High => "HIGH",
            CompatibilityLevel::Medium => "MEDIUM",
            CompatibilityLevel::Low => "LOW",
        }
    }
}

/// One score row per resume, owned by the quality scorer and recomputed
/// wholesale on every run. Narrative columns are written only by the
/// explanation adapter and never carry numbers.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeScoreRow {
    pub resume_id: Uuid,
    pub overall: i32,
    pub skills: i32,
    pub experience: i32,
    pub education: i32,
    pub completeness: i32,
    pub consistency: i32,
    pub breakdown: Value,
    pub method: String,
    pub scored_at: DateTime<Utc>,
    pub strengths: Option<Vec<String>>,
    pub gaps: Option<Vec<String>>,
    pub recommendations: Option<Vec<String>>,
    pub model_tag: Option<String>,
    pub explained_at: Option<DateTime<Utc>>,
    pub explain_input_hash: Option<String>,
    pub explain_raw: Option<String>,
}

/// Keyed by (resume, job), unique. Compatibility columns and match columns are
/// populated by different callers at different times; a given run overwrites
/// only the columns its algorithm computes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompatibilityMatchRow {
    pub id: Uuid,
    pub resume_id: Uuid,
    pub job_id: Uuid,
    pub level: Option<String>,
    pub skills_score: Option<i32>,
    pub experience_score: Option<i32>,
    pub education_score: Option<i32>,
    pub match_score: Option<i32>,
    pub match_breakdown: Option<Value>,
    pub strengths: Option<Vec<String>>,
    pub potential_gaps: Option<Vec<String>>,
    pub recommendations: Option<Vec<String>>,
    pub model_tag: Option<String>,
    pub explained_at: Option<DateTime<Utc>>,
    pub explain_input_hash: Option<String>,
    pub explain_raw: Option<String>,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SkillGapReportRow {
    pub resume_id: Uuid,
    pub target_role: String,
    pub coverage: i32,
    pub matching_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub extra_skills: Vec<String>,
    pub method: String,
    pub analyzed_at: DateTime<Utc>,
}

pub async fn get_resume(
    pool: &sqlx::PgPool,
    resume_id: Uuid,
) -> anyhow::Result<Option<super::resume::ResumeRow>> {
    Ok(
        sqlx::query_as::<_, super::resume::ResumeRow>("SELECT * FROM resumes WHERE id = $1")
            .bind(resume_id)
            .fetch_optional(pool)
            .await?,
    )
}

pub async fn get_score(
    pool: &sqlx::PgPool,
    resume_id: Uuid,
) -> anyhow::Result<Option<ResumeScoreRow>> {
    Ok(
        sqlx::query_as::<_, ResumeScoreRow>("SELECT * FROM resume_scores WHERE resume_id = $1")
            .bind(resume_id)
            .fetch_optional(pool)
            .await?,
    )
}

pub async fn get_match(
    pool: &sqlx::PgPool,
    resume_id: Uuid,
    job_id: Uuid,
) -> anyhow::Result<Option<CompatibilityMatchRow>> {
    Ok(sqlx::query_as::<_, CompatibilityMatchRow>(
        "SELECT * FROM compatibility_matches WHERE resume_id = $1 AND job_id = $2",
    )
    .bind(resume_id)
    .bind(job_id)
    .fetch_optional(pool)
    .await?)
}

pub async fn get_skill_gap(
    pool: &sqlx::PgPool,
    resume_id: Uuid,
    target_role: &str,
) -> anyhow::Result<Option<SkillGapReportRow>> {
    Ok(sqlx::query_as::<_, SkillGapReportRow>(
        "SELECT * FROM skill_gap_reports WHERE resume_id = $1 AND target_role = $2",
    )
    .bind(resume_id)
    .bind(target_role)
    .fetch_optional(pool)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_serializes_screaming() {
        assert_eq!(
            serde_json::to_string(&CompatibilityLevel::High).unwrap(),
            r#""HIGH""#
        );
        assert_eq!(CompatibilityLevel::Medium.as_str(), "MEDIUM");
    }
}
