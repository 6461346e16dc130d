//! Canonical Mapper — pure translation from any source shape into
//! `CanonicalResume`. No I/O. When a source offers several possible keys for a
//! concept ("title" vs "job_title"), the aliases are an explicit ordered list,
//! tried first-match, so the aliasing stays auditable per source type. Absent
//! fields map to `None`, never to an empty string.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::extraction::patterns::PatternFields;
use crate::models::resume::{
    CanonicalResume, EducationEntry, ExperienceEntry, LanguageEntry, ResumeSource, SkillEntry,
};

// ────────────────────────────────────────────────────────────────────────────
// Alias tables
// ────────────────────────────────────────────────────────────────────────────

const NAME_KEYS: &[&str] = &["full_name", "name", "candidate_name"];
const EMAIL_KEYS: &[&str] = &["email", "email_address"];
const PHONE_KEYS: &[&str] = &["phone", "phone_number", "mobile"];
const LOCATION_KEYS: &[&str] = &["location", "city", "address"];
const SUMMARY_KEYS: &[&str] = &["summary", "objective", "about"];
const EXPERIENCES_KEYS: &[&str] = &["work_experience", "experiences", "experience", "positions"];
const TITLE_KEYS: &[&str] = &["job_title", "title", "position", "role"];
const COMPANY_KEYS: &[&str] = &["company", "employer", "organization"];
const START_KEYS: &[&str] = &["start_date", "start", "from"];
const END_KEYS: &[&str] = &["end_date", "end", "to"];
const DESCRIPTION_KEYS: &[&str] = &["description", "summary", "details"];
const EDUCATION_KEYS: &[&str] = &["education", "educations", "degrees"];
const DEGREE_KEYS: &[&str] = &["degree", "qualification", "title"];
const INSTITUTION_KEYS: &[&str] = &["institution", "school", "university"];
const MAJOR_KEYS: &[&str] = &["major", "field_of_study", "specialization"];
const LANGUAGE_NAME_KEYS: &[&str] = &["name", "language"];
const SKILL_NAME_KEYS: &[&str] = &["name", "skill"];
const LEVEL_KEYS: &[&str] = &["level", "proficiency"];

// ────────────────────────────────────────────────────────────────────────────
// Plucking helpers
// ────────────────────────────────────────────────────────────────────────────

/// First non-empty string under any of the aliased keys, in order.
fn pluck_str(obj: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(s) = obj.get(key).and_then(Value::as_str) {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

/// Like `pluck_str`, but also looks one level down into nested contact blocks
/// the external parser sometimes emits.
fn pluck_contact(obj: &Value, keys: &[&str]) -> Option<String> {
    pluck_str(obj, keys).or_else(|| {
        ["contact", "basics", "personal"]
            .iter()
            .filter_map(|nest| obj.get(nest))
            .find_map(|nested| pluck_str(nested, keys))
    })
}

fn pluck_f64(obj: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| obj.get(*k).and_then(Value::as_f64))
}

fn pluck_i64(obj: &Value, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|k| obj.get(*k).and_then(Value::as_i64))
}

fn pluck_bool(obj: &Value, keys: &[&str]) -> bool {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_bool))
        .unwrap_or(false)
}

fn pluck_array<'a>(obj: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter().find_map(|k| obj.get(*k).and_then(Value::as_array))
}

/// Accepts "2021-03-15", "2021-03" and "2021".
fn parse_flex_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d").ok())
        .or_else(|| NaiveDate::parse_from_str(&format!("{s}-01-01"), "%Y-%m-%d").ok())
}

fn pluck_date(obj: &Value, keys: &[&str]) -> Option<NaiveDate> {
    pluck_str(obj, keys).as_deref().and_then(parse_flex_date)
}

// ────────────────────────────────────────────────────────────────────────────
// Source-shape mappers
// ────────────────────────────────────────────────────────────────────────────

/// Maps the external structured-parsing service's nested response.
pub fn map_external(raw: &Value, extracted_at: DateTime<Utc>) -> CanonicalResume {
    let mut resume = map_common(raw, ResumeSource::ExternalApi, extracted_at);
    resume.raw_text = pluck_str(raw, &["raw_text", "text"]);
    resume
}

/// Re-derives the canonical shape from previously stored structured data.
pub fn map_stored(stored: &Value, extracted_at: DateTime<Utc>) -> CanonicalResume {
    map_common(stored, ResumeSource::StoredData, extracted_at)
}

fn map_common(raw: &Value, source: ResumeSource, extracted_at: DateTime<Utc>) -> CanonicalResume {
    let mut resume = CanonicalResume::empty(source, extracted_at);

    resume.full_name = pluck_contact(raw, NAME_KEYS);
    resume.email = pluck_contact(raw, EMAIL_KEYS);
    resume.phone = pluck_contact(raw, PHONE_KEYS);
    resume.location = pluck_contact(raw, LOCATION_KEYS);
    resume.summary = pluck_str(raw, SUMMARY_KEYS);

    if let Some(links) = pluck_array(raw, &["links", "urls", "websites"]) {
        resume.links = links
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect();
    }

    if let Some(skills) = pluck_array(raw, &["skills"]) {
        resume.skills = skills.iter().filter_map(map_skill).collect();
    }

    if let Some(entries) = pluck_array(raw, EXPERIENCES_KEYS) {
        resume.experiences = entries.iter().filter_map(map_experience).collect();
    }

    if let Some(entries) = pluck_array(raw, EDUCATION_KEYS) {
        resume.education = entries.iter().filter_map(map_education).collect();
    }

    if let Some(certs) = pluck_array(raw, &["certifications", "certificates"]) {
        resume.certifications = certs
            .iter()
            .filter_map(|c| match c {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                obj @ Value::Object(_) => pluck_str(obj, &["name", "title"]),
                _ => None,
            })
            .collect();
    }

    if let Some(langs) = pluck_array(raw, &["languages"]) {
        resume.languages = langs
            .iter()
            .filter_map(|l| match l {
                Value::String(s) if !s.trim().is_empty() => Some(LanguageEntry {
                    name: s.trim().to_string(),
                    level: None,
                }),
                obj @ Value::Object(_) => pluck_str(obj, LANGUAGE_NAME_KEYS).map(|name| {
                    LanguageEntry {
                        name,
                        level: pluck_str(obj, LEVEL_KEYS),
                    }
                }),
                _ => None,
            })
            .collect();
    }

    resume
}

fn map_skill(value: &Value) -> Option<SkillEntry> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(SkillEntry {
            name: s.trim().to_string(),
            level: None,
            years: None,
        }),
        obj @ Value::Object(_) => pluck_str(obj, SKILL_NAME_KEYS).map(|name| SkillEntry {
            name,
            level: pluck_str(obj, LEVEL_KEYS),
            years: pluck_f64(obj, &["years", "years_of_experience"]),
        }),
        _ => None,
    }
}

fn map_experience(value: &Value) -> Option<ExperienceEntry> {
    let title = pluck_str(value, TITLE_KEYS)?;
    let end = pluck_date(value, END_KEYS);
    let is_current = pluck_bool(value, &["is_current", "current"])
        || pluck_str(value, END_KEYS)
            .map(|s| {
                let s = s.to_lowercase();
                s == "present" || s == "current"
            })
            .unwrap_or(false);
    Some(ExperienceEntry {
        title,
        company: pluck_str(value, COMPANY_KEYS),
        start: pluck_date(value, START_KEYS),
        end: if is_current { None } else { end },
        is_current,
        description: pluck_str(value, DESCRIPTION_KEYS),
        location: pluck_str(value, LOCATION_KEYS),
    })
}

fn map_education(value: &Value) -> Option<EducationEntry> {
    let degree = pluck_str(value, DEGREE_KEYS)?;
    Some(EducationEntry {
        degree,
        institution: pluck_str(value, INSTITUTION_KEYS),
        major: pluck_str(value, MAJOR_KEYS),
        year: pluck_i64(value, &["year", "end_year", "graduation_year"]).map(|y| y as i32),
        gpa: pluck_f64(value, &["gpa", "grade"]),
    })
}

/// Maps pattern-extractor output. The raw text travels with the resume so the
/// certificate pipeline and reviewers can see what was extracted from.
pub fn from_patterns(
    fields: PatternFields,
    raw_text: String,
    extracted_at: DateTime<Utc>,
) -> CanonicalResume {
    let mut resume = CanonicalResume::empty(ResumeSource::PatternExtraction, extracted_at);
    resume.full_name = fields.name;
    resume.email = fields.email;
    resume.phone = fields.phone;
    resume.skills = fields
        .skills
        .into_iter()
        .map(|name| SkillEntry {
            name,
            level: None,
            years: None,
        })
        .collect();
    resume.languages = fields
        .languages
        .into_iter()
        .map(|name| LanguageEntry { name, level: None })
        .collect();
    resume.education = fields
        .degrees
        .into_iter()
        .map(|degree| EducationEntry {
            degree,
            ..Default::default()
        })
        .collect();
    resume.experiences = fields
        .experience_spans
        .into_iter()
        .map(|span| ExperienceEntry {
            title: span.title,
            company: None,
            start: NaiveDate::from_ymd_opt(span.start_year, 1, 1),
            end: span.end_year.and_then(|y| NaiveDate::from_ymd_opt(y, 12, 31)),
            is_current: span.is_current,
            description: None,
            location: None,
        })
        .collect();
    resume.raw_text = Some(raw_text);
    resume
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_alias_prefers_more_specific_key() {
        // "job_title" outranks "title" in the ordered alias list.
        let entry = json!({ "job_title": "Backend Engineer", "title": "Engineer" });
        let exp = map_experience(&entry).unwrap();
        assert_eq!(exp.title, "Backend Engineer");
    }

    #[test]
    fn test_absent_fields_are_none_not_empty_string() {
        let raw = json!({ "name": "A", "summary": "" });
        let resume = map_external(&raw, Utc::now());
        assert_eq!(resume.summary, None);
        assert_eq!(resume.phone, None);
    }

    #[test]
    fn test_contact_block_fallback() {
        let raw = json!({ "contact": { "email": "x@y.z", "phone": "+1 555 0100" } });
        let resume = map_external(&raw, Utc::now());
        assert_eq!(resume.email.as_deref(), Some("x@y.z"));
        assert_eq!(resume.phone.as_deref(), Some("+1 555 0100"));
    }

    #[test]
    fn test_skills_accept_strings_and_objects() {
        let raw = json!({ "skills": ["PHP", { "skill": "Laravel", "level": "expert" }] });
        let resume = map_external(&raw, Utc::now());
        assert_eq!(resume.skills.len(), 2);
        assert_eq!(resume.skills[1].name, "Laravel");
        assert_eq!(resume.skills[1].level.as_deref(), Some("expert"));
    }

    #[test]
    fn test_present_end_date_marks_current() {
        let entry = json!({ "title": "Dev", "start_date": "2021-05", "end_date": "present" });
        let exp = map_experience(&entry).unwrap();
        assert!(exp.is_current);
        assert_eq!(exp.end, None);
        assert_eq!(exp.start, NaiveDate::from_ymd_opt(2021, 5, 1));
    }

    #[test]
    fn test_flex_date_year_only() {
        assert_eq!(parse_flex_date("2019"), NaiveDate::from_ymd_opt(2019, 1, 1));
        assert_eq!(parse_flex_date("not a date"), None);
    }

    #[test]
    fn test_map_stored_tags_source() {
        let stored = json!({ "name": "B", "skills": ["Go"] });
        let resume = map_stored(&stored, Utc::now());
        assert_eq!(resume.source, ResumeSource::StoredData);
        assert!(resume.is_usable());
    }
}
