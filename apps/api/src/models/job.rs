use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A job posting as the scoring engines see it. Listing CRUD lives outside
/// this service; rows here are read-only reference input.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub title: String,
    pub required_skills: Vec<String>,
    pub skill_categories: Vec<String>,
    pub min_years: i32,
    pub education_level: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

pub async fn get_job(pool: &sqlx::PgPool, job_id: Uuid) -> anyhow::Result<Option<JobRow>> {
    Ok(sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
        .bind(job_id)
        .fetch_optional(pool)
        .await?)
}

pub async fn list_active_jobs(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<Vec<JobRow>> {
    Ok(sqlx::query_as::<_, JobRow>(
        "SELECT * FROM jobs WHERE is_active ORDER BY created_at DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?)
}

/// Active jobs whose title contains any keyword of the role label, used when a
/// skill-gap target is a role name rather than an explicit skill list. The
/// sample is capped to bound cost.
pub async fn find_active_jobs_by_title_keywords(
    pool: &sqlx::PgPool,
    role_label: &str,
    limit: i64,
) -> anyhow::Result<Vec<JobRow>> {
    let patterns: Vec<String> = role_label
        .split_whitespace()
        .filter(|w| w.len() >= 3)
        .map(|w| format!("%{}%", w.to_lowercase()))
        .collect();
    if patterns.is_empty() {
        return Ok(vec![]);
    }
    Ok(sqlx::query_as::<_, JobRow>(
        "SELECT * FROM jobs WHERE is_active AND lower(title) LIKE ANY($1) LIMIT $2",
    )
    .bind(&patterns)
    .bind(limit)
    .fetch_all(pool)
    .await?)
}
