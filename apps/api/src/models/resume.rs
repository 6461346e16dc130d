use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Which extraction strategy produced a canonical resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResumeSource {
    ExternalApi,
    PatternExtraction,
    StoredData,
    Manual,
}

impl ResumeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResumeSource::ExternalApi => "external-api",
            ResumeSource::PatternExtraction => "pattern-extraction",
            ResumeSource::StoredData => "stored-data",
            ResumeSource::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillEntry {
    pub name: String,
    pub level: Option<String>,
    pub years: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub title: String,
    pub company: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub is_current: bool,
    pub description: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationEntry {
    pub degree: String,
    pub institution: Option<String>,
    pub major: Option<String>,
    pub year: Option<i32>,
    pub gpa: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageEntry {
    pub name: String,
    pub level: Option<String>,
}

/// The one normalized shape all resume sources converge on before scoring.
/// Immutable value object; each extraction attempt produces a fresh instance.
/// Absent fields are `None`, never `""` — "missing" stays distinguishable from
/// "present but blank" downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalResume {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub links: Vec<String>,
    pub summary: Option<String>,
    pub skills: Vec<SkillEntry>,
    pub experiences: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub certifications: Vec<String>,
    pub languages: Vec<LanguageEntry>,
    pub source: ResumeSource,
    pub extracted_at: DateTime<Utc>,
    pub raw_text: Option<String>,
}

impl CanonicalResume {
    pub fn empty(source: ResumeSource, extracted_at: DateTime<Utc>) -> Self {
        Self {
            full_name: None,
            email: None,
            phone: None,
            location: None,
            links: vec![],
            summary: None,
            skills: vec![],
            experiences: vec![],
            education: vec![],
            certifications: vec![],
            languages: vec![],
            source,
            extracted_at,
            raw_text: None,
        }
    }

    /// A result is usable if it carries a name, an email, or at least one skill.
    /// The extraction chain selects the first usable attempt.
    pub fn is_usable(&self) -> bool {
        self.full_name.is_some() || self.email.is_some() || !self.skills.is_empty()
    }

    pub fn skill_names(&self) -> Vec<String> {
        self.skills.iter().map(|s| s.name.clone()).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub document_key: Option<String>,
    pub file_name: Option<String>,
    pub canonical: Option<Value>,
    pub stored_profile: Option<Value>,
    pub source: Option<String>,
    pub extracted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResumeRow {
    /// Deserializes the persisted canonical resume, if extraction has run.
    pub fn canonical_resume(&self) -> Option<CanonicalResume> {
        self.canonical
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usable_requires_name_email_or_skill() {
        let mut r = CanonicalResume::empty(ResumeSource::Manual, Utc::now());
        assert!(!r.is_usable());
        r.skills.push(SkillEntry {
            name: "Rust".into(),
            ..Default::default()
        });
        assert!(r.is_usable());
    }

    #[test]
    fn test_usable_with_email_only() {
        let mut r = CanonicalResume::empty(ResumeSource::PatternExtraction, Utc::now());
        r.email = Some("a@b.io".into());
        assert!(r.is_usable());
    }

    #[test]
    fn test_source_serializes_kebab_case() {
        let json = serde_json::to_string(&ResumeSource::PatternExtraction).unwrap();
        assert_eq!(json, r#""pattern-extraction""#);
    }
}
