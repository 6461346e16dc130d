//! Resume-vs-job compatibility: a coarse HIGH/MEDIUM/LOW classification over
//! three weighted components. Distinct from the finer-grained numeric match
//! score in `job_match` — both upsert into the same (resume, job) row but each
//! overwrites only the columns it computes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashSet;
use uuid::Uuid;

use crate::clock::Clock;
use crate::models::job::JobRow;
use crate::models::matching::CompatibilityLevel;
use crate::models::resume::CanonicalResume;
use crate::scoring::weights::CompatibilityWeights;
use crate::scoring::{
    experience_years_score, highest_degree_score, normalize_skill, title_words,
    total_experience_years,
};

pub const METHOD: &str = "compatibility-v1";

#[derive(Debug, Clone, Serialize)]
pub struct CompatibilityScore {
    pub level: CompatibilityLevel,
    pub total: i32,
    pub skills_score: i32,
    pub experience_score: i32,
    pub education_score: i32,
}

/// Pure function of (resume skills/experience/education, job requirements).
pub fn compatibility(
    resume: &CanonicalResume,
    job: &JobRow,
    clock: &dyn Clock,
    weights: &CompatibilityWeights,
) -> CompatibilityScore {
    let now = clock.now();

    let skills_score = skills_component(resume, job);
    let experience_score = experience_component(resume, job, now);
    let education_score = highest_degree_score(&resume.education);

    let total = (f64::from(skills_score) * f64::from(weights.skills)
        + f64::from(experience_score) * f64::from(weights.experience)
        + f64::from(education_score) * f64::from(weights.education))
        / 100.0;
    let total = total.round() as i32;

    let level = if total >= 70 {
        CompatibilityLevel::High
    } else if total >= 50 {
        CompatibilityLevel::Medium
    } else {
        CompatibilityLevel::Low
    };

    CompatibilityScore {
        level,
        total,
        skills_score,
        experience_score,
        education_score,
    }
}

/// Overlap percentage plus up to 10 bonus points for carrying more skills
/// than the job requires. An empty requirement set scores 100 — absence of a
/// requirement is not a penalty.
fn skills_component(resume: &CanonicalResume, job: &JobRow) -> i32 {
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
    let overlap = (matched as f64 / required.len() as f64 * 100.0).round() as i32;

    let surplus = candidate.len() as i32 - required.len() as i32;
    let bonus = if surplus > 0 { (surplus * 2).min(10) } else { 0 };

    (overlap + bonus).min(100)
}

/// Years-of-experience bracket, +10 if any experience title textually
/// overlaps the job title.
fn experience_component(resume: &CanonicalResume, job: &JobRow, now: DateTime<Utc>) -> i32 {
    let years = total_experience_years(&resume.experiences, now);
    let mut score = experience_years_score(years);

    let job_words = title_words(&job.title);
    let overlaps = resume
        .experiences
        .iter()
        .any(|e| !title_words(&e.title).is_disjoint(&job_words));
    if overlaps {
        score += 10;
    }
    score.min(100)
}

/// Upserts only the compatibility columns; match columns written by another
/// caller at another time are left untouched. Last writer wins per pair.
pub async fn persist_compatibility(
    pool: &PgPool,
    resume_id: Uuid,
    job_id: Uuid,
    s: &CompatibilityScore,
    computed_at: DateTime<Utc>,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO compatibility_matches
            (id, resume_id, job_id, level, skills_score, experience_score,
             education_score, computed_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (resume_id, job_id) DO UPDATE SET
            level = $4, skills_score = $5, experience_score = $6,
            education_score = $7, computed_at = $8
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(resume_id)
    .bind(job_id)
    .bind(s.level.as_str())
    .bind(s.skills_score)
    .bind(s.experience_score)
    .bind(s.education_score)
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

    fn job_requiring(title: &str, skills: &[&str]) -> JobRow {
        JobRow {
            id: Uuid::new_v4(),
            title: title.to_string(),
            required_skills: skills.iter().map(|s| s.to_string()).collect(),
            skill_categories: vec![],
            min_years: 0,
            education_level: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_three_of_four_required_skills() {
        // {PHP, Laravel, MySQL} against {PHP, Laravel, MySQL, Git} → 75.
        let resume = resume_with_skills(&["PHP", "Laravel", "MySQL"]);
        let job = job_requiring("Backend Developer", &["PHP", "Laravel", "MySQL", "Git"]);
        assert_eq!(skills_component(&resume, &job), 75);
    }

    #[test]
    fn test_empty_requirement_scores_100() {
        let resume = resume_with_skills(&[]);
        let job = job_requiring("Anything", &[]);
        assert_eq!(skills_component(&resume, &job), 100);
    }

    #[test]
    fn test_surplus_skills_earn_capped_bonus() {
        let resume = resume_with_skills(&["PHP", "SQL", "Git", "Docker", "AWS", "Rust", "Go", "C#", "Vue", "CSS"]);
        let job = job_requiring("Dev", &["PHP"]);
        // Full overlap already 100; bonus cannot push past the cap.
        assert_eq!(skills_component(&resume, &job), 100);

        let job = job_requiring("Dev", &["PHP", "Kafka"]);
        // 1/2 matched = 50, surplus 8 → bonus capped at 10.
        assert_eq!(skills_component(&resume, &job), 60);
    }

    #[test]
    fn test_skill_match_is_case_insensitive() {
        let resume = resume_with_skills(&["php", "LARAVEL"]);
        let job = job_requiring("Dev", &["PHP", "Laravel"]);
        assert_eq!(skills_component(&resume, &job), 100);
    }

    #[test]
    fn test_no_experience_hits_floor_bracket() {
        // Compatibility intentionally differs from the quality scorer here:
        // zero entries means totalYears = 0 < 1 → the floor bracket, 20.
        let clock = fixed(2026, 1, 1);
        let resume = resume_with_skills(&[]);
        let job = job_requiring("Engineer", &[]);
        assert_eq!(experience_component(&resume, &job, clock.now()), 20);
    }

    #[test]
    fn test_title_overlap_bonus() {
        let clock = fixed(2026, 1, 1);
        let mut resume = resume_with_skills(&[]);
        resume.experiences = vec![ExperienceEntry {
            title: "Senior Backend Engineer".into(),
            start: NaiveDate::from_ymd_opt(2024, 1, 1),
            is_current: true,
            ..Default::default()
        }];
        let job = job_requiring("Backend Developer", &[]);
        // 2 years → bracket 40, +10 for the "backend" overlap.
        assert_eq!(experience_component(&resume, &job, clock.now()), 50);
    }

    #[test]
    fn test_level_thresholds() {
        let clock = fixed(2026, 1, 1);
        let weights = CompatibilityWeights::default();

        // Strong candidate: full skills, long tenure with title overlap, master's.
        let mut resume = resume_with_skills(&["PHP", "Laravel", "MySQL"]);
        resume.experiences = vec![ExperienceEntry {
            title: "Backend Engineer".into(),
            start: NaiveDate::from_ymd_opt(2012, 1, 1),
            is_current: true,
            description: Some("apis".into()),
            ..Default::default()
        }];
        resume.education = vec![EducationEntry {
            degree: "Master of Science".into(),
            ..Default::default()
        }];
        let job = job_requiring("Backend Developer", &["PHP", "Laravel", "MySQL"]);
        let result = compatibility(&resume, &job, &clock, &weights);
        // skills 100*.40 + experience 100*.35 + education 90*.25 = 97.5 → 98
        assert_eq!(result.total, 98);
        assert_eq!(result.level, CompatibilityLevel::High);

        // Bare resume: skills 0, experience 20, education 0 → 7 → LOW.
        let resume = resume_with_skills(&[]);
        let job = job_requiring("Backend Developer", &["PHP"]);
        let result = compatibility(&resume, &job, &clock, &weights);
        assert_eq!(result.total, 7);
        assert_eq!(result.level, CompatibilityLevel::Low);
    }

    #[test]
    fn test_deterministic() {
        let clock = fixed(2026, 1, 1);
        let resume = resume_with_skills(&["PHP", "SQL"]);
        let job = job_requiring("Data Engineer", &["SQL", "Python"]);
        let weights = CompatibilityWeights::default();
        let a = compatibility(&resume, &job, &clock, &weights);
        let b = compatibility(&resume, &job, &clock, &weights);
        assert_eq!(a.total, b.total);
        assert_eq!(a.level, b.level);
    }
}
