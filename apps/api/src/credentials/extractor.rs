//! Credential extraction: derives structured credential rows from the
//! free-text certification lines of a canonical resume. The parser pulls out
//! a verification URL and a credential id where present, then splits the
//! remainder into certificate name and issuer. Inserts are idempotent per
//! `(resume, name, issuer)`, so re-running the pipeline never duplicates
//! rows.

use regex::Regex;
use serde_json::json;
use sqlx::PgPool;
use std::sync::OnceLock;
use uuid::Uuid;

use crate::models::resume::CanonicalResume;

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://[^\s)]+").unwrap())
}

fn credential_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\(?\s*(?:credential\s+)?(?:id|no\.?|number)\s*[:#]\s*([A-Za-z0-9][A-Za-z0-9\-/]*)\s*\)?")
            .unwrap()
    })
}

const NAME_ISSUER_SEPARATORS: &[&str] = &[" - ", " \u{2013} ", " \u{2014} ", ", ", " by "];

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedCredential {
    pub name: String,
    pub issuer_name: String,
    pub credential_id: Option<String>,
    pub credential_url: Option<String>,
}

/// Parses one certification line. Returns `None` when no certificate name can
/// be recovered; a missing issuer maps to an empty issuer name, which the
/// assessment table later classifies as unknown.
pub fn parse_certification(text: &str) -> Option<ExtractedCredential> {
    let mut remainder = text.trim().to_string();
    if remainder.is_empty() {
        return None;
    }

    let url_hit = url_re()
        .find(&remainder)
        .map(|m| (m.range(), m.as_str().trim_end_matches(['.', ',']).to_string()));
    let credential_url = url_hit.map(|(range, url)| {
        remainder.replace_range(range, "");
        url
    });

    let id_hit = credential_id_re()
        .captures(&remainder)
        .map(|c| (c.get(0).map(|m| m.range()), c[1].to_string()));
    let credential_id = id_hit.map(|(range, id)| {
        if let Some(range) = range {
            remainder.replace_range(range, "");
        }
        id
    });

    let (name, issuer_name) = split_name_issuer(&remainder);
    if name.is_empty() {
        return None;
    }
    Some(ExtractedCredential {
        name,
        issuer_name,
        credential_id,
        credential_url,
    })
}

fn split_name_issuer(text: &str) -> (String, String) {
    for separator in NAME_ISSUER_SEPARATORS {
        if let Some((name, issuer)) = text.split_once(separator) {
            let name = tidy(name);
            let issuer = tidy(issuer);
            if !name.is_empty() && !issuer.is_empty() {
                return (name, issuer);
            }
        }
    }
    (tidy(text), String::new())
}

fn tidy(text: &str) -> String {
    text.trim()
        .trim_matches(|c: char| matches!(c, '(' | ')' | ',' | '-' | '.'))
        .trim()
        .to_string()
}

/// Inserts a credential row per parseable certification and returns the ids
/// of every credential still awaiting verification for this resume.
pub async fn extract_credentials(
    pool: &PgPool,
    resume_id: Uuid,
    resume: &CanonicalResume,
) -> anyhow::Result<Vec<Uuid>> {
    for line in &resume.certifications {
        let Some(parsed) = parse_certification(line) else {
            continue;
        };
        sqlx::query(
            r#"
            INSERT INTO credentials
                (id, resume_id, name, issuer_name, credential_id, credential_url,
                 extracted_data, extraction_method)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (resume_id, name, issuer_name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(resume_id)
        .bind(&parsed.name)
        .bind(&parsed.issuer_name)
        .bind(&parsed.credential_id)
        .bind(&parsed.credential_url)
        .bind(json!({ "raw": line }))
        .bind(resume.source.as_str())
        .execute(pool)
        .await?;
    }

    let pending: Vec<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM credentials WHERE resume_id = $1 AND status = 'pending'",
    )
    .bind(resume_id)
    .fetch_all(pool)
    .await?;
    Ok(pending.into_iter().map(|(id,)| id).collect())
}
