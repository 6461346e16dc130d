//! Resume-quality scorer: five independent 0–100 sub-scores combined by a
//! weighted overall. Recomputed wholesale on every run; a fresh score
//! invalidates any prior narrative, so the persist step clears the
//! explanation columns.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::clock::Clock;
use crate::models::resume::CanonicalResume;
use crate::scoring::weights::QualityWeights;
use crate::scoring::{highest_degree_score, total_experience_years};

/// Tag identifying this deterministic algorithm version.
pub const METHOD: &str = "quality-v1";

#[derive(Debug, Clone, Serialize)]
pub struct ResumeScore {
    pub overall: i32,
    pub skills: i32,
    pub experience: i32,
    pub education: i32,
    pub completeness: i32,
    pub consistency: i32,
    pub breakdown: Value,
    pub method: String,
    pub scored_at: DateTime<Utc>,
}

/// Scores a canonical resume. Pure — identical input and clock always yield
/// identical output.
pub fn score(resume: &CanonicalResume, clock: &dyn Clock, weights: &QualityWeights) -> ResumeScore {
    let now = clock.now();

    let skills = skills_score(resume.skills.len());
    let experience = experience_score(resume, now);
    let education = highest_degree_score(&resume.education);
    let completeness = completeness_score(resume);
    let consistency = consistency_score(resume, now);

    let weighted = |sub: i32, w: i32| f64::from(sub) * f64::from(w) / 100.0;
    let overall = (weighted(skills, weights.skills)
        + weighted(experience, weights.experience)
        + weighted(education, weights.education)
        + weighted(completeness, weights.completeness)
        + weighted(consistency, weights.consistency))
    .round() as i32;

    let breakdown = json!({
        "skills":       { "score": skills,       "weight": weights.skills,       "weighted": weighted(skills, weights.skills) },
        "experience":   { "score": experience,   "weight": weights.experience,   "weighted": weighted(experience, weights.experience) },
        "education":    { "score": education,    "weight": weights.education,    "weighted": weighted(education, weights.education) },
        "completeness": { "score": completeness, "weight": weights.completeness, "weighted": weighted(completeness, weights.completeness) },
        "consistency":  { "score": consistency,  "weight": weights.consistency,  "weighted": weighted(consistency, weights.consistency) },
    });

    ResumeScore {
        overall,
        skills,
        experience,
        education,
        completeness,
        consistency,
        breakdown,
        method: METHOD.to_string(),
        scored_at: now,
    }
}

/// Step function of skill count.
fn skills_score(count: usize) -> i32 {
    match count {
        0 => 0,
        n if n >= 10 => 100,
        n if n >= 7 => 85,
        n if n >= 5 => 70,
        n if n >= 3 => 50,
        _ => 30,
    }
}

fn experience_score(resume: &CanonicalResume, now: DateTime<Utc>) -> i32 {
    if resume.experiences.is_empty() {
        return 0;
    }
    let years = total_experience_years(&resume.experiences, now);
    let base = if years >= 10.0 {
        60
    } else if years >= 5.0 {
        50
    } else if years >= 3.0 {
        35
    } else if years >= 1.0 {
        20
    } else {
        10
    };
    let described = resume
        .experiences
        .iter()
        .filter(|e| e.description.as_deref().map(str::trim).is_some_and(|d| !d.is_empty()))
        .count() as i32;
    let entry_bonus = (resume.experiences.len() as i32 * 5).min(25);
    (base + described * 15 + entry_bonus).min(100)
}

/// Weighted presence check: 70% on the five required fields, 30% on the five
/// optional ones, each proportional to how many are non-empty.
fn completeness_score(resume: &CanonicalResume) -> i32 {
    let required = [
        resume.full_name.is_some(),
        resume.email.is_some(),
        !resume.skills.is_empty(),
        !resume.experiences.is_empty(),
        !resume.education.is_empty(),
    ];
    let optional = [
        resume.phone.is_some(),
        resume.location.is_some(),
        resume.summary.is_some(),
        !resume.languages.is_empty(),
        !resume.certifications.is_empty(),
    ];
    let frac = |fields: &[bool]| {
        fields.iter().filter(|p| **p).count() as f64 / fields.len() as f64
    };
    (frac(&required) * 70.0 + frac(&optional) * 30.0).round() as i32
}

/// Starts at 100; −10 per >12-month gap between consecutive entries (sorted by
/// start date descending), −5 per entry lacking a description; floor 0.
fn consistency_score(resume: &CanonicalResume, now: DateTime<Utc>) -> i32 {
    let mut score = 100i32;

    let mut dated: Vec<_> = resume
        .experiences
        .iter()
        .filter(|e| e.start.is_some())
        .collect();
    dated.sort_by(|a, b| b.start.cmp(&a.start));

    for pair in dated.windows(2) {
        let recent_start = pair[0].start.expect("filtered on start");
        let older_end = match (pair[1].is_current, pair[1].end) {
            (false, Some(end)) => end,
            _ => now.date_naive(),
        };
        let gap_days = (recent_start - older_end).num_days();
        if gap_days > 365 {
            score -= 10;
        }
    }

    let undescribed = resume
        .experiences
        .iter()
        .filter(|e| e.description.as_deref().map(str::trim).map_or(true, str::is_empty))
        .count() as i32;
    score -= undescribed * 5;

    score.max(0)
}

/// Upserts the score row wholesale, clearing any stale narrative.
pub async fn persist_score(pool: &PgPool, resume_id: Uuid, s: &ResumeScore) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO resume_scores
            (resume_id, overall, skills, experience, education, completeness,
             consistency, breakdown, method, scored_at,
             strengths, gaps, recommendations, model_tag, explained_at,
             explain_input_hash, explain_raw)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                NULL, NULL, NULL, NULL, NULL, NULL, NULL)
        ON CONFLICT (resume_id) DO UPDATE SET
            overall = $2, skills = $3, experience = $4, education = $5,
            completeness = $6, consistency = $7, breakdown = $8, method = $9,
            scored_at = $10,
            strengths = NULL, gaps = NULL, recommendations = NULL,
            model_tag = NULL, explained_at = NULL, explain_input_hash = NULL,
            explain_raw = NULL
        "#,
    )
    .bind(resume_id)
    .bind(s.overall)
    .bind(s.skills)
    .bind(s.experience)
    .bind(s.education)
    .bind(s.completeness)
    .bind(s.consistency)
    .bind(&s.breakdown)
    .bind(&s.method)
    .bind(s.scored_at)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::fixed;
    use crate::models::resume::{
        EducationEntry, ExperienceEntry, ResumeSource, SkillEntry,
    };
    use chrono::NaiveDate;

    fn skill(name: &str) -> SkillEntry {
        SkillEntry {
            name: name.into(),
            ..Default::default()
        }
    }

    fn experience(
        start: (i32, u32, u32),
        end: Option<(i32, u32, u32)>,
        description: Option<&str>,
    ) -> ExperienceEntry {
        ExperienceEntry {
            title: "Engineer".into(),
            start: NaiveDate::from_ymd_opt(start.0, start.1, start.2),
            end: end.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            is_current: end.is_none(),
            description: description.map(String::from),
            ..Default::default()
        }
    }

    fn base_resume() -> CanonicalResume {
        CanonicalResume::empty(ResumeSource::Manual, chrono::Utc::now())
    }

    #[test]
    fn test_skills_step_function() {
        assert_eq!(skills_score(0), 0);
        assert_eq!(skills_score(1), 30);
        assert_eq!(skills_score(3), 50);
        assert_eq!(skills_score(5), 70);
        assert_eq!(skills_score(7), 85);
        assert_eq!(skills_score(10), 100);
        assert_eq!(skills_score(14), 100);
    }

    #[test]
    fn test_zero_experience_entries_score_zero() {
        // No entries at all means 0, not the floor bracket.
        let clock = fixed(2026, 1, 1);
        let resume = base_resume();
        let result = score(&resume, &clock, &QualityWeights::default());
        assert_eq!(result.experience, 0);
    }

    #[test]
    fn test_experience_points_add_up_and_cap() {
        let clock = fixed(2026, 1, 1);
        let mut resume = base_resume();
        // Eleven years with a description: 60 base + 15 desc + 5 entry = 80.
        resume.experiences = vec![experience((2015, 1, 1), None, Some("shipped things"))];
        let result = score(&resume, &clock, &QualityWeights::default());
        assert_eq!(result.experience, 80);

        // Six described entries saturate the cap.
        resume.experiences = (0..6)
            .map(|i| experience((2015 + i, 1, 1), Some((2016 + i, 1, 1)), Some("work")))
            .collect();
        let result = score(&resume, &clock, &QualityWeights::default());
        assert_eq!(result.experience, 100);
    }

    #[test]
    fn test_determinism_with_fixed_clock() {
        let clock = fixed(2026, 1, 1);
        let mut resume = base_resume();
        resume.full_name = Some("A".into());
        resume.skills = vec![skill("PHP"), skill("SQL"), skill("Git")];
        resume.experiences = vec![experience((2020, 1, 1), None, Some("x"))];
        let a = score(&resume, &clock, &QualityWeights::default());
        let b = score(&resume, &clock, &QualityWeights::default());
        assert_eq!(a.overall, b.overall);
        assert_eq!(a.breakdown, b.breakdown);
    }

    #[test]
    fn test_completeness_weighting() {
        let mut resume = base_resume();
        assert_eq!(completeness_score(&resume), 0);

        // All five required fields, no optional: 70.
        resume.full_name = Some("A".into());
        resume.email = Some("a@b.c".into());
        resume.skills = vec![skill("Rust")];
        resume.experiences = vec![experience((2020, 1, 1), None, None)];
        resume.education = vec![EducationEntry {
            degree: "BSc".into(),
            ..Default::default()
        }];
        assert_eq!(completeness_score(&resume), 70);

        // One of five optional fields adds 6.
        resume.phone = Some("123".into());
        assert_eq!(completeness_score(&resume), 76);
    }

    #[test]
    fn test_consistency_gap_penalty() {
        let clock = fixed(2026, 1, 1);
        let mut resume = base_resume();
        // 2016-2018, then a two-year hole, then 2020-present. Both described.
        resume.experiences = vec![
            experience((2020, 6, 1), None, Some("current role")),
            experience((2016, 1, 1), Some((2018, 1, 1)), Some("old role")),
        ];
        let result = score(&resume, &clock, &QualityWeights::default());
        assert_eq!(result.consistency, 90);
    }

    #[test]
    fn test_consistency_description_penalty_and_floor() {
        let clock = fixed(2026, 1, 1);
        let mut resume = base_resume();
        resume.experiences = (0..25)
            .map(|i| experience((2000 + i, 1, 1), Some((2000 + i, 6, 1)), None))
            .collect();
        let result = score(&resume, &clock, &QualityWeights::default());
        // 25 undescribed entries and many gaps drive it to the floor.
        assert_eq!(result.consistency, 0);
    }

    #[test]
    fn test_overall_weighted_sum() {
        let clock = fixed(2026, 1, 1);
        let mut resume = base_resume();
        resume.full_name = Some("A".into());
        resume.email = Some("a@b.c".into());
        resume.skills = (0..10).map(|i| skill(&format!("s{i}"))).collect();
        resume.experiences = vec![
            experience((2020, 1, 1), None, Some("lead work")),
            experience((2014, 1, 1), Some((2020, 1, 1)), Some("ic work")),
        ];
        resume.education = vec![EducationEntry {
            degree: "Master of Science".into(),
            ..Default::default()
        }];
        let result = score(&resume, &clock, &QualityWeights::default());
        // skills 100*0.25 + experience 100*0.30 + education 90*0.20
        // + completeness 70*0.15 + consistency 100*0.10 = 93.5 → 94
        assert_eq!(result.skills, 100);
        assert_eq!(result.experience, 100);
        assert_eq!(result.education, 90);
        assert_eq!(result.completeness, 70);
        assert_eq!(result.consistency, 100);
        assert_eq!(result.overall, 94);
        assert_eq!(result.method, METHOD);
    }
}
