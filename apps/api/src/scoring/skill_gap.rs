//! Skill-Gap Engine — deterministic set difference between a candidate's
//! skills and a target role's required skills. Purely set-theoretic: no
//! weighting, no fuzzy matching beyond case folding.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashSet;
use uuid::Uuid;

use crate::models::job;
use crate::scoring::normalize_skill;

pub const METHOD: &str = "set-difference-v1";

/// Cap on the job sample when deriving a target skill set from a role label.
const ROLE_JOB_SAMPLE_CAP: i64 = 20;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SkillGap {
    pub coverage: i32,
    pub matching_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub extra_skills: Vec<String>,
}

/// `matching = target ∩ candidate`, `missing = target − candidate`,
/// `extra = candidate − target`. Coverage is 100 for an empty target set,
/// otherwise `|matching| / |target| × 100` rounded. Output order follows the
/// input lists (target order for matching/missing, candidate order for extra)
/// so reports are stable.
pub fn gap(candidate_skills: &[String], target_skills: &[String]) -> SkillGap {
    let candidate: HashSet<String> = candidate_skills.iter().map(|s| normalize_skill(s)).collect();
    let target: HashSet<String> = target_skills.iter().map(|s| normalize_skill(s)).collect();

    let mut matching_skills = Vec::new();
    let mut missing_skills = Vec::new();
    let mut seen = HashSet::new();
    for skill in target_skills {
        let key = normalize_skill(skill);
        if !seen.insert(key.clone()) {
            continue;
        }
        if candidate.contains(&key) {
            matching_skills.push(skill.clone());
        } else {
            missing_skills.push(skill.clone());
        }
    }

    let mut extra_skills = Vec::new();
    let mut seen = HashSet::new();
    for skill in candidate_skills {
        let key = normalize_skill(skill);
        if seen.insert(key.clone()) && !target.contains(&key) {
            extra_skills.push(skill.clone());
        }
    }

    let coverage = if target.is_empty() {
        100
    } else {
        (matching_skills.len() as f64 / target.len() as f64 * 100.0).round() as i32
    };

    SkillGap {
        coverage,
        matching_skills,
        missing_skills,
        extra_skills,
    }
}

/// Derives a target skill set for a role label by keyword-matching active job
/// titles and unioning their required skills. The sample is capped.
pub async fn derive_target_skills(
    pool: &PgPool,
    role_label: &str,
) -> anyhow::Result<Vec<String>> {
    let jobs = job::find_active_jobs_by_title_keywords(pool, role_label, ROLE_JOB_SAMPLE_CAP).await?;
    let mut seen = HashSet::new();
    let mut skills = Vec::new();
    for job in jobs {
        for skill in job.required_skills {
            if seen.insert(normalize_skill(&skill)) {
                skills.push(skill);
            }
        }
    }
    Ok(skills)
}

/// Replaces the whole report for the (resume, role) pair.
pub async fn persist_report(
    pool: &PgPool,
    resume_id: Uuid,
    target_role: &str,
    report: &SkillGap,
    analyzed_at: DateTime<Utc>,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO skill_gap_reports
            (resume_id, target_role, coverage, matching_skills, missing_skills,
             extra_skills, method, analyzed_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (resume_id, target_role) DO UPDATE SET
            coverage = $3, matching_skills = $4, missing_skills = $5,
            extra_skills = $6, method = $7, analyzed_at = $8
        "#,
    )
    .bind(resume_id)
    .bind(target_role)
    .bind(report.coverage)
    .bind(&report.matching_skills)
    .bind(&report.missing_skills)
    .bind(&report.extra_skills)
    .bind(METHOD)
    .bind(analyzed_at)
    .execute(pool)
    .await?;
    Ok(())
}
