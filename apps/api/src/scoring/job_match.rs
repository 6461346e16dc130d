//! Numeric resume-vs-job match score (0–100) over five weighted components.
//! Related skills are approximated by skill-category overlap; empty
//! requirement sets score 100 for their component — absence of a requirement
//! is never a penalty.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use std::collections::HashSet;
use uuid::Uuid;

use crate::clock::Clock;
use crate::models::job::JobRow;
use crate::models::resume::CanonicalResume;
use crate::scoring::weights::MatchWeights;
use crate::scoring::{
    experience_years_score, highest_degree_score, normalize_skill, title_words,
    total_experience_years,
};

pub const METHOD: &str = "match-v1";

/// Category assignments for well-known skills, the proxy behind the
/// "related skills" component.
const SKILL_CATEGORIES: &[(&str, &str)] = &[
    ("php", "backend"),
    ("laravel", "backend"),
    ("python", "backend"),
    ("django", "backend"),
    ("java", "backend"),
    ("kotlin", "backend"),
    ("go", "backend"),
    ("rust", "backend"),
    ("ruby", "backend"),
    ("rails", "backend"),
    ("c#", "backend"),
    (".net", "backend"),
    ("node.js", "backend"),
    ("javascript", "frontend"),
    ("typescript", "frontend"),
    ("react", "frontend"),
    ("vue", "frontend"),
    ("angular", "frontend"),
    ("html", "frontend"),
    ("css", "frontend"),
    ("sass", "frontend"),
    ("flutter", "mobile"),
    ("swift", "mobile"),
    ("mysql", "database"),
    ("postgresql", "database"),
    ("mongodb", "database"),
    ("sql", "database"),
    ("redis", "database"),
    ("elasticsearch", "database"),
    ("docker", "devops"),
    ("kubernetes", "devops"),
    ("terraform", "devops"),
    ("git", "devops"),
    ("linux", "devops"),
    ("aws", "cloud"),
    ("azure", "cloud"),
    ("gcp", "cloud"),
    ("kafka", "data"),
    ("rabbitmq", "data"),
    ("spark", "data"),
    ("hadoop", "data"),
    ("pandas", "data"),
    ("numpy", "data"),
    ("tensorflow", "ml"),
    ("pytorch", "ml"),
];

#[derive(Debug, Clone, Serialize)]
pub struct MatchScore {
    pub total: i32,
    pub exact_skills: i32,
    pub related_skills: i32,
    pub experience_years: i32,
    pub experience_relevance: i32,
    pub education: i32,
    pub breakdown: Value,
}

/// Pure function of (resume skills/experience/education, job requirements).
pub fn match_score(
    resume: &CanonicalResume,
    job: &JobRow,
    clock: &dyn Clock,
    weights: &MatchWeights,
) -> MatchScore {
    let now = clock.now();

    let exact_skills = exact_skills_component(resume, job);
    let related_skills = related_skills_component(resume, job);
    let experience_years =
        experience_years_score(total_experience_years(&resume.experiences, now));
    let experience_relevance = relevance_component(resume, job);
    let education = highest_degree_score(&resume.education);

    let weighted = |sub: i32, w: i32| f64::from(sub) * f64::from(w) / 100.0;
    let total = (weighted(exact_skills, weights.exact_skills)
        + weighted(related_skills, weights.related_skills)
        + weighted(experience_years, weights.experience_years)
        + weighted(experience_relevance, weights.experience_relevance)
        + weighted(education, weights.education))
    .round() as i32;

    let breakdown = json!({
        "method": METHOD,
        "exact_skills":         { "score": exact_skills,         "weight": weights.exact_skills },
        "related_skills":       { "score": related_skills,       "weight": weights.related_skills },
        "experience_years":     { "score": experience_years,     "weight": weights.experience_years },
        "experience_relevance": { "score": experience_relevance, "weight": weights.experience_relevance },
        "education":            { "score": education,            "weight": weights.education },
    });

    MatchScore {
        total,
        exact_skills,
        related_skills,
        experience_years,
        experience_relevance,
        education,
        breakdown,
    }
}

fn exact_skills_component(resume: &CanonicalResume, job: &JobRow) -> i32 {
    if job.required_skills.is_empty() {
        return 100;
    }
    let candidate: HashSet<String> = resume
        .skills
        .iter()
        .map(|s| normalize_skill(&s.name))
        .collect();
    let required: HashSet<String> = job
        .required_skills
        .iter()
        .map(|s| normalize_skill(s))
        .collect();
    let matched = required.intersection(&candidate).count();
    (matched as f64 / required.len() as f64 * 100.0).round() as i32
}

/// Skill-category overlap percentage, the stand-in for "related skills".
fn related_skills_component(resume: &CanonicalResume, job: &JobRow) -> i32 {
    if job.skill_categories.is_empty() {
        return 100;
    }
    let candidate_categories: HashSet<&str> = resume
        .skills
        .iter()
        .filter_map(|s| category_of(&normalize_skill(&s.name)))
        .collect();
    let wanted: HashSet<String> = job
        .skill_categories
        .iter()
        .map(|c| c.to_lowercase())
        .collect();
    let covered = wanted
        .iter()
        .filter(|c| candidate_categories.contains(c.as_str()))
        .count();
    (covered as f64 / wanted.len() as f64 * 100.0).round() as i32
}

fn category_of(skill: &str) -> Option<&'static str> {
    SKILL_CATEGORIES
        .iter()
        .find(|(name, _)| *name == skill)
        .map(|(_, cat)| *cat)
}

/// Keyword overlap between the job title and experience titles, 25 points per
/// distinct matched keyword, capped at 100.
fn relevance_component(resume: &CanonicalResume, job: &JobRow) -> i32 {
    let job_words = title_words(&job.title);
    if job_words.is_empty() {
        return 100;
    }
    let experience_words: HashSet<String> = resume
        .experiences
        .iter()
        .flat_map(|e| title_words(&e.title))
        .collect();
    let matched = job_words.intersection(&experience_words).count() as i32;
    (matched * 25).min(100)
}

/// Upserts only the match columns of the (resume, job) row. Last writer wins.
pub async fn persist_match(
    pool: &PgPool,
    resume_id: Uuid,
    job_id: Uuid,
    s: &MatchScore,
    computed_at: DateTime<Utc>,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO compatibility_matches
            (id, resume_id, job_id, match_score, match_breakdown, computed_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (resume_id, job_id) DO UPDATE SET
            match_score = $4, match_breakdown = $5, computed_at = $6
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(resume_id)
    .bind(job_id)
    .bind(s.total)
    .bind(&s.breakdown)
    .bind(computed_at)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::fixed;
    use crate::models::resume::{EducationEntry, ExperienceEntry, ResumeSource, SkillEntry};
    use chrono::NaiveDate;

    fn resume_with_skills(names: &[&str]) -> CanonicalResume {
        let mut r = CanonicalResume::empty(ResumeSource::Manual, Utc::now());
        r.skills = names
            .iter()
            .map(|n| SkillEntry {
                name: n.to_string(),
                ..Default::default()
            })
            .collect();
        r
    }

    fn job(title: &str, skills: &[&str], categories: &[&str]) -> JobRow {
        JobRow {
            id: Uuid::new_v4(),
            title: title.to_string(),
            required_skills: skills.iter().map(|s| s.to_string()).collect(),
            skill_categories: categories.iter().map(|s| s.to_string()).collect(),
            min_years: 0,
            education_level: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_three_of_four_exact_skills() {
        let resume = resume_with_skills(&["PHP", "Laravel", "MySQL"]);
        let j = job("Backend Developer", &["PHP", "Laravel", "MySQL", "Git"], &[]);
        assert_eq!(exact_skills_component(&resume, &j), 75);
    }

    #[test]
    fn test_empty_requirements_score_100_each() {
        let resume = resume_with_skills(&[]);
        let j = job("", &[], &[]);
        assert_eq!(exact_skills_component(&resume, &j), 100);
        assert_eq!(related_skills_component(&resume, &j), 100);
        assert_eq!(relevance_component(&resume, &j), 100);
    }

    #[test]
    fn test_related_skills_via_categories() {
        let resume = resume_with_skills(&["PHP", "MySQL"]);
        // Candidate covers backend + database out of three wanted categories.
        let j = job("Dev", &[], &["backend", "database", "frontend"]);
        assert_eq!(related_skills_component(&resume, &j), 67);
    }

    #[test]
    fn test_relevance_capped_at_100() {
        let mut resume = resume_with_skills(&[]);
        resume.experiences = vec![ExperienceEntry {
            title: "Principal Distributed Systems Platform Reliability Engineer".into(),
            ..Default::default()
        }];
        let j = job(
            "Principal Distributed Systems Platform Reliability Engineer",
            &[],
            &[],
        );
        assert_eq!(relevance_component(&resume, &j), 100);
    }

    #[test]
    fn test_finer_experience_brackets() {
        assert_eq!(experience_years_score(0.0), 20);
        assert_eq!(experience_years_score(1.0), 40);
        assert_eq!(experience_years_score(3.0), 60);
        assert_eq!(experience_years_score(5.0), 75);
        assert_eq!(experience_years_score(7.0), 90);
        assert_eq!(experience_years_score(10.0), 100);
    }

    #[test]
    fn test_full_weighted_total() {
        let clock = fixed(2026, 1, 1);
        let mut resume = resume_with_skills(&["PHP", "Laravel", "MySQL"]);
        resume.experiences = vec![ExperienceEntry {
            title: "Backend Developer".into(),
            start: NaiveDate::from_ymd_opt(2015, 1, 1),
            is_current: true,
            ..Default::default()
        }];
        resume.education = vec![EducationEntry {
            degree: "Bachelor of Science".into(),
            ..Default::default()
        }];
        let j = job("Backend Developer", &["PHP", "Laravel", "MySQL", "Git"], &["backend", "database"]);
        let result = match_score(&resume, &j, &clock, &MatchWeights::default());
        assert_eq!(result.exact_skills, 75);
        assert_eq!(result.related_skills, 100);
        assert_eq!(result.experience_years, 100);
        assert_eq!(result.experience_relevance, 50);
        assert_eq!(result.education, 75);
        // 75*.30 + 100*.15 + 100*.25 + 50*.15 + 75*.15 = 81.25 → 81
        assert_eq!(result.total, 81);
    }

    #[test]
    fn test_deterministic_repeat_calls() {
        let clock = fixed(2026, 1, 1);
        let resume = resume_with_skills(&["Rust", "SQL"]);
        let j = job("Platform Engineer", &["Rust"], &["backend"]);
        let a = match_score(&resume, &j, &clock, &MatchWeights::default());
        let b = match_score(&resume, &j, &clock, &MatchWeights::default());
        assert_eq!(a.total, b.total);
        assert_eq!(a.breakdown, b.breakdown);
    }
}
