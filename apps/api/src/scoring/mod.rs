//! Scoring engines — stateless, deterministic weighted scoring.
//!
//! Every function here is a pure computation over canonical data plus an
//! injected clock. No randomness, no I/O inside the algorithms; persistence
//! lives in each engine's own `persist_*` function because each engine owns
//! writes to its record type.

pub mod compatibility;
pub mod job_match;
pub mod quality;
pub mod skill_gap;
pub mod weights;

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::models::resume::{EducationEntry, ExperienceEntry};

/// Total experience across entries, in years. Each span is
/// `(end-or-now − start) / 365.25` days; negative spans clamp to 0 and entries
/// without a start date contribute nothing.
pub fn total_experience_years(experiences: &[ExperienceEntry], now: DateTime<Utc>) -> f64 {
    experiences.iter().map(|e| span_years(e, now)).sum()
}

fn span_years(entry: &ExperienceEntry, now: DateTime<Utc>) -> f64 {
    let Some(start) = entry.start else {
        return 0.0;
    };
    let end = match (entry.is_current, entry.end) {
        (false, Some(end)) => end,
        _ => now.date_naive(),
    };
    let days = (end - start).num_days() as f64;
    (days / 365.25).max(0.0)
}

/// Highest-degree heuristic shared by the quality and compatibility scorers:
/// doctorate 100, master's 90, bachelor's 75, diploma/associate 50, anything
/// else 30, no education 0.
pub fn highest_degree_score(education: &[EducationEntry]) -> i32 {
    education
        .iter()
        .map(|e| degree_rank(&e.degree))
        .max()
        .unwrap_or(0)
}

fn degree_rank(degree: &str) -> i32 {
    let d = degree.to_lowercase();
    if d.contains("phd") || d.contains("ph.d") || d.contains("doctor") {
        100
    } else if d.contains("master") || d.contains("msc") || d.contains("m.sc") || d.contains("mba") {
        90
    } else if d.contains("bachelor") || d.contains("bsc") || d.contains("b.sc") || d.contains("b.tech")
    {
        75
    } else if d.contains("diploma") || d.contains("associate") {
        50
    } else {
        30
    }
}

/// Years-of-experience bracket used by the compatibility and match scorers.
pub fn experience_years_score(years: f64) -> i32 {
    if years >= 10.0 {
        100
    } else if years >= 7.0 {
        90
    } else if years >= 5.0 {
        75
    } else if years >= 3.0 {
        60
    } else if years >= 1.0 {
        40
    } else {
        20
    }
}

pub fn normalize_skill(name: &str) -> String {
    name.trim().to_lowercase()
}

const TITLE_STOPWORDS: &[&str] = &["and", "the", "for", "with", "of", "at", "in"];

/// Meaningful words of a title, for textual-overlap checks.
pub fn title_words(title: &str) -> HashSet<String> {
    title
        .split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|w| w.len() >= 3 && !TITLE_STOPWORDS.contains(&w.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn exp(start: (i32, u32, u32), end: Option<(i32, u32, u32)>, current: bool) -> ExperienceEntry {
        ExperienceEntry {
            title: "Engineer".into(),
            start: NaiveDate::from_ymd_opt(start.0, start.1, start.2),
            end: end.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            is_current: current,
            ..Default::default()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_span_years_basic() {
        let entries = vec![exp((2020, 1, 1), Some((2024, 1, 1)), false)];
        let years = total_experience_years(&entries, now());
        assert!((years - 4.0).abs() < 0.02, "got {years}");
    }

    #[test]
    fn test_current_entry_runs_to_now() {
        let entries = vec![exp((2024, 1, 1), None, true)];
        let years = total_experience_years(&entries, now());
        assert!((years - 2.0).abs() < 0.02, "got {years}");
    }

    #[test]
    fn test_negative_span_clamped_to_zero() {
        let entries = vec![exp((2024, 1, 1), Some((2020, 1, 1)), false)];
        assert_eq!(total_experience_years(&entries, now()), 0.0);
    }

    #[test]
    fn test_degree_ranks() {
        assert_eq!(degree_rank("PhD in Physics"), 100);
        assert_eq!(degree_rank("Master of Science"), 90);
        assert_eq!(degree_rank("Bachelor of Arts"), 75);
        assert_eq!(degree_rank("Associate Degree"), 50);
        assert_eq!(degree_rank("Certificate of Attendance"), 30);
        assert_eq!(highest_degree_score(&[]), 0);
    }

    #[test]
    fn test_experience_bracket_monotonic() {
        // Increasing years from 0 to 11 never decreases the score.
        let mut prev = 0;
        for tenths in 0..=110 {
            let score = experience_years_score(tenths as f64 / 10.0);
            assert!(score >= prev, "dropped at {} years", tenths as f64 / 10.0);
            prev = score;
        }
        assert_eq!(experience_years_score(0.0), 20);
        assert_eq!(experience_years_score(11.0), 100);
    }

    #[test]
    fn test_title_words_filters_stopwords_and_short_words() {
        let words = title_words("Head of QA and Test");
        assert!(words.contains("head"));
        assert!(words.contains("test"));
        assert!(!words.contains("of"));
        assert!(!words.contains("qa"));
    }
}
